use serde::Deserialize;

/// Query parameters of the gallery index.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQuery {
    pub current_filter: Option<String>,
    pub search_string: Option<String>,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_number() -> i64 {
    1
}

fn default_page_size() -> i64 {
    8
}

impl GalleryQuery {
    /// Filter in effect: a new search wins over the carried-over filter.
    pub fn effective_filter(&self) -> Option<&str> {
        self.search_string
            .as_deref()
            .or(self.current_filter.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Page to show; a new search always starts at page 1.
    pub fn effective_page(&self) -> u64 {
        if self.search_string.is_some() {
            1
        } else {
            self.page_number.max(1) as u64
        }
    }

    pub fn effective_page_size(&self) -> u64 {
        self.page_size.max(1) as u64
    }

    /// Index location for page 1 with the same size and filter.
    pub fn first_page_location(&self) -> String {
        let mut location = format!("/gallery?pageNumber=1&pageSize={}", self.effective_page_size());
        if let Some(filter) = self.effective_filter() {
            location.push_str("&currentFilter=");
            location.extend(url::form_urlencoded::byte_serialize(filter.as_bytes()));
        }
        location
    }
}

/// Edit form fields.
#[derive(Debug, Clone, Deserialize)]
pub struct EditImageForm {
    pub title: String,
    #[serde(default)]
    pub tags: String,
}
