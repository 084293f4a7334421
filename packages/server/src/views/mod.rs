//! Server-rendered HTML pages.
//!
//! Every dynamic value passes through [`escape`] before it reaches markup.

use crate::models::image::{GalleryDetailModel, GalleryImage};
use crate::models::paging::PagedList;

/// Escape text for use in element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a value for a query string.
pub fn encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

/// Percent-encode a value for a path segment, where `+` is not a space.
fn encode_segment(text: &str) -> String {
    encode(text).replace('+', "%20")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Image Gallery</title>
</head>
<body>
<nav><a href="/">Home</a> | <a href="/gallery">Gallery</a> | <a href="/upload">Upload</a></nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn tag_links(tags: &[String]) -> String {
    tags.iter()
        .map(|t| {
            format!(
                r#"<a class="tag" href="/gallery/tag/{}">{}</a>"#,
                encode_segment(t),
                escape(t)
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn card(image: &GalleryDetailModel) -> String {
    format!(
        r#"<figure class="image" id="image-{id}">
<a href="/gallery/detail/{id}"><img src="{url}" alt="{title}"></a>
<figcaption>{title} <small>{tags}</small></figcaption>
</figure>
"#,
        id = image.id,
        url = escape(&image.url),
        title = escape(&image.title),
        tags = tag_links(&image.tags),
    )
}

pub fn home(images: Vec<GalleryImage>) -> String {
    let mut body = String::from("<h1>Latest images</h1>\n");
    if images.is_empty() {
        body.push_str(r#"<p>No images yet. <a href="/upload">Upload one</a>.</p>"#);
    }
    for image in images {
        body.push_str(&card(&image.into()));
    }
    layout("Home", &body)
}

pub fn gallery_index(page: &PagedList<GalleryDetailModel>, filter: Option<&str>) -> String {
    let filter = filter.unwrap_or_default();
    let mut body = format!(
        r#"<h1>Gallery</h1>
<form method="get" action="/gallery">
<input type="text" name="searchString" value="{}">
<button type="submit">Search</button> <a href="/gallery">Back to full list</a>
</form>
"#,
        escape(filter)
    );

    if page.items.is_empty() {
        body.push_str("<p>No images found.</p>\n");
    }
    for image in &page.items {
        body.push_str(&card(image));
    }

    let link = |page_number: u64| {
        format!(
            "/gallery?pageNumber={page_number}&pageSize={}&currentFilter={}",
            page.page_size,
            encode(filter)
        )
    };
    body.push_str("<nav class=\"pager\">");
    if page.has_previous_page() {
        body.push_str(&format!(
            r#"<a rel="prev" href="{}">Previous</a> "#,
            escape(&link(page.page_index - 1))
        ));
    }
    body.push_str(&format!(
        "Page {} of {} ({} images)",
        page.page_index,
        page.total_pages.max(1),
        page.total_count
    ));
    if page.has_next_page() {
        body.push_str(&format!(
            r#" <a rel="next" href="{}">Next</a>"#,
            escape(&link(page.page_index + 1))
        ));
    }
    body.push_str("</nav>\n");

    layout("Gallery", &body)
}

pub fn tagged(tag: &str, images: Vec<GalleryImage>) -> String {
    let mut body = format!("<h1>Tagged &ldquo;{}&rdquo;</h1>\n", escape(tag));
    if images.is_empty() {
        body.push_str("<p>No images carry this tag.</p>\n");
    }
    for image in images {
        body.push_str(&card(&image.into()));
    }
    layout(tag, &body)
}

pub fn detail(model: &GalleryDetailModel) -> String {
    let body = format!(
        r#"<h1>{title}</h1>
<img src="{url}" alt="{title}">
<dl>
<dt>Created</dt><dd>{created}</dd>
<dt>Tags</dt><dd>{tags}</dd>
</dl>
<p><a href="/gallery/edit/{id}">Edit</a> | <a href="/gallery/delete/{id}">Delete</a></p>
"#,
        id = model.id,
        title = escape(&model.title),
        url = escape(&model.url),
        created = model.created.format("%Y-%m-%d %H:%M:%S UTC"),
        tags = tag_links(&model.tags),
    );
    layout(&model.title, &body)
}

/// Edit form filled with `title` and `tags`, which may be unsaved input.
pub fn edit(id: i32, title: &str, tags: &str, error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Edit image</h1>
{error}<form method="post" action="/gallery/edit/{id}">
<label>Title <input type="text" name="title" value="{title}"></label>
<label>Tags <input type="text" name="tags" value="{tags}"></label>
<button type="submit">Save</button>
</form>
<p><a href="/gallery/detail/{id}">Cancel</a></p>
"#,
        error = error_banner(error),
        title = escape(title),
        tags = escape(tags),
    );
    layout("Edit image", &body)
}

pub fn delete_confirm(image: &GalleryImage, error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Delete image</h1>
{error}<p>Delete <strong>{title}</strong>?</p>
<img src="{url}" alt="{title}">
<form method="post" action="/gallery/delete/{id}">
<button type="submit">Delete</button>
</form>
<p><a href="/gallery/detail/{id}">Cancel</a></p>
"#,
        error = error_banner(error),
        id = image.id,
        title = escape(&image.title),
        url = escape(&image.url),
    );
    layout("Delete image", &body)
}

pub fn upload_form() -> String {
    let body = r#"<h1>Upload an image</h1>
<form method="post" action="/upload" enctype="multipart/form-data">
<label>Title <input type="text" name="title"></label>
<label>Tags <input type="text" name="tags" placeholder="beach, evening"></label>
<input type="file" name="file" accept="image/*">
<button type="submit">Upload</button>
</form>
"#;
    layout("Upload", body)
}

pub fn error_page(status: u16, message: &str) -> String {
    let body = format!("<h1>Error {status}</h1>\n<p>{}</p>\n", escape(message));
    layout("Error", &body)
}

fn error_banner(error: Option<&str>) -> String {
    error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default()
}
