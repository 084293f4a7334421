use url::Url;

use super::error::StorageError;

const DEVELOPMENT_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Blob service settings read from a `Key=Value;Key=Value` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Service endpoint, always ending in `/`.
    pub blob_endpoint: Url,
    /// Shared access signature appended to every request, without the leading `?`.
    pub sas_token: Option<String>,
    pub account_name: Option<String>,
    /// Present for completeness; requests are not signed with it.
    pub account_key: Option<String>,
}

impl ConnectionString {
    pub fn parse(input: &str) -> Result<Self, StorageError> {
        let mut blob_endpoint = None;
        let mut sas_token = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut development = false;

        for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Values such as SAS tokens and base64 keys contain '='.
            let Some((key, value)) = segment.split_once('=') else {
                return Err(invalid(format!("segment '{segment}' is not Key=Value")));
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "blobendpoint" => blob_endpoint = Some(value.to_string()),
                "sharedaccesssignature" => {
                    sas_token = Some(value.trim_start_matches('?').to_string())
                }
                "accountname" => account_name = Some(value.to_string()),
                "accountkey" => account_key = Some(value.to_string()),
                "defaultendpointsprotocol" => protocol = Some(value.to_ascii_lowercase()),
                "endpointsuffix" => suffix = Some(value.to_string()),
                "usedevelopmentstorage" => development = value.eq_ignore_ascii_case("true"),
                // Endpoints for other services are irrelevant here.
                _ => {}
            }
        }

        let endpoint = match (blob_endpoint, development, &account_name) {
            (Some(endpoint), _, _) => endpoint,
            (None, true, _) => DEVELOPMENT_ENDPOINT.to_string(),
            (None, false, Some(account)) => format!(
                "{}://{}.blob.{}",
                protocol.as_deref().unwrap_or("https"),
                account,
                suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
            ),
            (None, false, None) => {
                return Err(invalid(
                    "one of BlobEndpoint, AccountName or UseDevelopmentStorage is required".into(),
                ));
            }
        };

        let mut blob_endpoint =
            Url::parse(&endpoint).map_err(|e| invalid(format!("blob endpoint '{endpoint}': {e}")))?;
        if blob_endpoint.cannot_be_a_base() {
            return Err(invalid(format!("blob endpoint '{endpoint}' cannot be a base")));
        }
        if !blob_endpoint.path().ends_with('/') {
            let path = format!("{}/", blob_endpoint.path());
            blob_endpoint.set_path(&path);
        }
        blob_endpoint.set_query(None);

        if development && account_name.is_none() {
            account_name = Some("devstoreaccount1".to_string());
        }

        Ok(Self {
            blob_endpoint,
            sas_token: sas_token.filter(|t| !t.is_empty()),
            account_name,
            account_key,
        })
    }
}

fn invalid(message: String) -> StorageError {
    StorageError::InvalidConfiguration(format!("connection string: {message}"))
}
