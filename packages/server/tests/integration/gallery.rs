use std::sync::Arc;

use async_trait::async_trait;
use gallery_server::models::image::GalleryImage;
use gallery_server::services::image::ImageRepository;
use sea_orm::DbErr;
use url::Url;

use crate::common::{StoreKind, TestApp, routes};

/// Reads go to the real repository, writes always fail.
struct FailingWrites(Arc<dyn ImageRepository>);

#[async_trait]
impl ImageRepository for FailingWrites {
    async fn get_all(&self) -> Result<Vec<GalleryImage>, DbErr> {
        self.0.get_all().await
    }

    async fn range(&self, skip: u64, take: u64) -> Result<Vec<GalleryImage>, DbErr> {
        self.0.range(skip, take).await
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<GalleryImage>, DbErr> {
        self.0.get_by_id(id).await
    }

    async fn set_image(
        &self,
        title: &str,
        tags_text: &str,
        uri: &Url,
    ) -> Result<GalleryImage, DbErr> {
        self.0.set_image(title, tags_text, uri).await
    }

    async fn update_image(&self, _image: &GalleryImage) -> Result<Option<GalleryImage>, DbErr> {
        Err(DbErr::Custom("database is locked".into()))
    }

    async fn delete_image(&self, _id: i32) -> Result<Option<GalleryImage>, DbErr> {
        Err(DbErr::Custom("database is locked".into()))
    }
}

async fn failing_app() -> TestApp {
    TestApp::spawn_with(StoreKind::Filesystem, |images| Arc::new(FailingWrites(images))).await
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn home_shows_latest_images() {
        let app = TestApp::spawn().await;
        app.seed_image("Sunset", "beach, evening").await;
        app.seed_image("Harbor", "sea").await;

        let res = app.get(routes::HOME).await;
        assert_eq!(res.status, 200);
        let harbor = res.text.find("Harbor").expect("Harbor missing");
        let sunset = res.text.find("Sunset").expect("Sunset missing");
        assert!(harbor < sunset, "newest image should come first");
    }

    #[tokio::test]
    async fn page_number_below_one_redirects_to_first_page() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::gallery_page(0, 8)).await;
        assert_eq!(res.status, 303);
        assert_eq!(
            res.location.as_deref(),
            Some("/gallery?pageNumber=1&pageSize=8")
        );
    }

    #[tokio::test]
    async fn pages_split_images() {
        let app = TestApp::spawn().await;
        for i in 1..=3 {
            app.seed_image(&format!("Photo {i}"), "").await;
        }

        let first = app.get(&routes::gallery_page(1, 2)).await;
        assert_eq!(first.status, 200);
        assert!(first.text.contains("Photo 3"));
        assert!(first.text.contains("Photo 2"));
        assert!(!first.text.contains("Photo 1"));
        assert!(first.text.contains("Page 1 of 2"));

        let second = app.get(&routes::gallery_page(2, 2)).await;
        assert!(second.text.contains("Photo 1"));
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let app = TestApp::spawn().await;
        app.seed_image("Sunset", "").await;

        let res = app.get(&routes::gallery_page(5, 8)).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("No images found"));
        assert!(!res.text.contains("Sunset"));
    }

    #[tokio::test]
    async fn search_filters_titles() {
        let app = TestApp::spawn().await;
        app.seed_image("Sunset", "").await;
        app.seed_image("Harbor", "").await;

        let res = app.get(&format!("{}?searchString=Sun", routes::GALLERY)).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("Sunset"));
        assert!(!res.text.contains("Harbor"));

        let res = app.get(&format!("{}?searchString=sun", routes::GALLERY)).await;
        assert!(!res.text.contains("Sunset"), "title search is case-sensitive");
    }

    #[tokio::test]
    async fn tag_page_lists_exact_matches() {
        let app = TestApp::spawn().await;
        app.seed_image("Sunset", "beach, evening").await;
        app.seed_image("Harbor", "beaches").await;

        let res = app.get(&routes::tag("beach")).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("Sunset"));
        assert!(!res.text.contains("Harbor"));
    }
}

mod detail {
    use super::*;

    #[tokio::test]
    async fn shows_title_and_tags() {
        let app = TestApp::spawn().await;
        let id = app.seed_image("Sunset", "beach, evening").await;

        let res = app.get(&routes::detail(id)).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("<h1>Sunset</h1>"));
        assert!(res.text.contains("/gallery/tag/beach"));
        assert!(res.text.contains("/gallery/tag/evening"));
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let app = TestApp::spawn().await;

        assert_eq!(app.get(&routes::detail(999)).await.status, 404);
        assert_eq!(app.get(&routes::edit(999)).await.status, 404);
        assert_eq!(app.get(&routes::delete(999)).await.status, 404);
    }
}

mod malformed_requests {
    use super::*;

    #[tokio::test]
    async fn non_numeric_id_renders_error_page() {
        let app = TestApp::spawn().await;

        for path in ["/gallery/detail/abc", "/gallery/edit/abc", "/gallery/delete/abc"] {
            let res = app.get(path).await;
            assert_eq!(res.status, 400, "{path}");
            assert!(res.text.contains("<h1>Error 400</h1>"), "{path}");
            assert_eq!(res.content_type.as_deref(), Some("text/html; charset=utf-8"));
        }

        let res = app
            .post_form("/gallery/edit/abc", &[("title", "Dusk"), ("tags", "")])
            .await;
        assert_eq!(res.status, 400);
        assert!(res.text.contains("<h1>Error 400</h1>"));
    }

    #[tokio::test]
    async fn bad_page_number_renders_error_page() {
        let app = TestApp::spawn().await;

        let res = app.get("/gallery?pageNumber=x").await;
        assert_eq!(res.status, 400);
        assert!(res.text.contains("<h1>Error 400</h1>"));
        assert_eq!(res.content_type.as_deref(), Some("text/html; charset=utf-8"));
    }
}

mod edit {
    use super::*;

    #[tokio::test]
    async fn form_is_prefilled() {
        let app = TestApp::spawn().await;
        let id = app.seed_image("Sunset", "beach, evening").await;

        let res = app.get(&routes::edit(id)).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("value=\"Sunset\""));
        assert!(res.text.contains("value=\"beach, evening\""));
    }

    #[tokio::test]
    async fn updates_title_and_tags() {
        let app = TestApp::spawn().await;
        let id = app.seed_image("Sunset", "beach, evening").await;
        let before = app.images.get_by_id(id).await.unwrap().unwrap();

        let res = app
            .post_form(&routes::edit(id), &[("title", "Dusk"), ("tags", "sky")])
            .await;
        assert_eq!(res.status, 303);
        assert_eq!(res.location.as_deref(), Some("/gallery"));

        let after = app.images.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.title, "Dusk");
        assert_eq!(after.tags_text(), "sky");
        assert_eq!(after.url, before.url);
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(&routes::edit(42), &[("title", "Dusk"), ("tags", "")])
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn malformed_form_is_rejected() {
        let app = TestApp::spawn().await;
        let id = app.seed_image("Sunset", "").await;

        let res = app.post_form(&routes::edit(id), &[("tags", "sky")]).await;
        assert_eq!(res.status, 400);
        assert_eq!(app.images.get_by_id(id).await.unwrap().unwrap().title, "Sunset");
    }

    #[tokio::test]
    async fn save_failure_redisplays_submitted_values() {
        let app = failing_app().await;
        let id = app.seed_image("Sunset", "beach").await;

        let res = app
            .post_form(&routes::edit(id), &[("title", "Dusk"), ("tags", "sky")])
            .await;
        assert_eq!(res.status, 500);
        assert!(res.text.contains("value=\"Dusk\""));
        assert!(res.text.contains("value=\"sky\""));
        assert!(res.text.contains("could not be saved"));
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn confirmation_shows_image() {
        let app = TestApp::spawn().await;
        let id = app.seed_image("Sunset", "").await;

        let res = app.get(&routes::delete(id)).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("<strong>Sunset</strong>"));
    }

    #[tokio::test]
    async fn removes_image() {
        let app = TestApp::spawn().await;
        let id = app.seed_image("Sunset", "beach").await;

        let res = app.post_form(&routes::delete(id), &[]).await;
        assert_eq!(res.status, 303);
        assert_eq!(res.location.as_deref(), Some("/gallery"));
        assert!(app.images.get_by_id(id).await.unwrap().is_none());
        assert_eq!(app.get(&routes::detail(id)).await.status, 404);
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.post_form(&routes::delete(7), &[]).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn failure_redisplays_confirmation() {
        let app = failing_app().await;
        let id = app.seed_image("Sunset", "").await;

        let res = app.post_form(&routes::delete(id), &[]).await;
        assert_eq!(res.status, 500);
        assert!(res.text.contains("<strong>Sunset</strong>"));
        assert!(res.text.contains("could not be deleted"));
        assert!(app.images.get_by_id(id).await.unwrap().is_some());
    }
}
