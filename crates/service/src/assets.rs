/// Derives public view URLs for stored files. Pure: no network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocator {
    endpoint: String,
    project_id: String,
    bucket_id: String,
}

impl AssetLocator {
    pub fn new(endpoint: &str, project_id: &str, bucket_id: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            bucket_id: bucket_id.to_string(),
        }
    }

    pub fn bucket_id(&self) -> &str { &self.bucket_id }

    /// `<endpoint>/storage/buckets/<bucket>/files/<file>/view?project=<project>`
    pub fn url(&self, asset_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.endpoint, self.bucket_id, asset_id, self.project_id
        )
    }
}
