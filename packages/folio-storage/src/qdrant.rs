use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct,
		Query, QueryPointsBuilder, ScrollPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
		value::Kind, vectors_output::VectorsOptions,
	},
};
use serde_json::json;

use crate::{Error, Result};

pub const DOC_ID_PAYLOAD_KEY: &str = "doc_id";

/// One vector per entry, keyed by the entry's public doc id. The point id is
/// the doc id itself, so upserts overwrite stale vectors in place.
pub struct VectorStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl VectorStore {
	pub fn new(cfg: &folio_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
				VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
			))
			.await?;

		tracing::info!(collection = %self.collection, "Created vector collection.");

		Ok(())
	}

	pub async fn upsert(&self, vectors: Vec<(String, Vec<f32>)>) -> Result<()> {
		if vectors.is_empty() {
			return Ok(());
		}

		let points = vectors
			.into_iter()
			.map(|(doc_id, vector)| {
				let payload = Payload::try_from(json!({ DOC_ID_PAYLOAD_KEY: doc_id.clone() }))
					.map_err(|err| Error::InvalidArgument(err.to_string()))?;

				Ok(PointStruct::new(doc_id, vector, payload))
			})
			.collect::<Result<Vec<_>>>()?;

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(())
	}

	pub async fn point_count(&self) -> Result<u64> {
		let response =
			self.client.count(CountPointsBuilder::new(self.collection.clone()).exact(true)).await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}

	pub async fn find_vector(&self, doc_id: &str) -> Result<Option<Vec<f32>>> {
		let response = self
			.client
			.scroll(
				ScrollPointsBuilder::new(self.collection.clone())
					.filter(Filter::must([Condition::matches(
						DOC_ID_PAYLOAD_KEY,
						doc_id.to_string(),
					)]))
					.with_vectors(true)
					.limit(1),
			)
			.await?;
		let Some(point) = response.result.into_iter().next() else {
			return Ok(None);
		};

		let vector = point.vectors.and_then(|vectors| vectors.vectors_options).and_then(
			|options| match options {
				VectorsOptions::Vector(vector) => Some(vector.data),
				VectorsOptions::Vectors(_) => None,
			},
		);

		Ok(vector)
	}

	/// Nearest neighbours by cosine similarity, excluding the query doc
	/// itself.
	pub async fn nearest(
		&self,
		vector: Vec<f32>,
		exclude_doc_id: &str,
		limit: u64,
	) -> Result<Vec<(String, f32)>> {
		let response = self
			.client
			.query(
				QueryPointsBuilder::new(self.collection.clone())
					.query(Query::new_nearest(vector))
					.filter(Filter::must_not([Condition::matches(
						DOC_ID_PAYLOAD_KEY,
						exclude_doc_id.to_string(),
					)]))
					.with_payload(true)
					.limit(limit),
			)
			.await?;
		let hits = response
			.result
			.into_iter()
			.filter_map(|point| {
				let doc_id = point.payload.get(DOC_ID_PAYLOAD_KEY).and_then(|value| {
					if let Some(Kind::StringValue(s)) = &value.kind {
						Some(s.clone())
					} else {
						None
					}
				})?;

				Some((doc_id, point.score))
			})
			.collect();

		Ok(hits)
	}

	pub async fn delete_collection(&self) -> Result<()> {
		self.client.delete_collection(self.collection.clone()).await?;

		Ok(())
	}
}
