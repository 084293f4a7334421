use crate::common::{CONTAINER, StoreKind, TestApp, routes};

mod upload_form {
    use super::*;

    #[tokio::test]
    async fn renders_multipart_form() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::UPLOAD).await;
        assert_eq!(res.status, 200);
        assert!(res.text.contains("enctype=\"multipart/form-data\""));
    }
}

mod upload_image {
    use super::*;

    #[tokio::test]
    async fn stores_blob_and_records_image() {
        let app = TestApp::spawn().await;
        app.seed_image("Harbor", "sea").await;

        let form = TestApp::upload_form("Sunset", "beach, evening", "sunset.png", b"png-bytes");
        let res = app.post_multipart(routes::UPLOAD, form).await;
        assert_eq!(res.status, 303);
        assert_eq!(res.location.as_deref(), Some("/gallery"));

        let images = app.images.get_all().await.unwrap();
        assert_eq!(images.len(), 2);
        let newest = &images[0];
        assert_eq!(newest.title, "Sunset");
        let tags: Vec<_> = newest.tags.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(tags, ["beach", "evening"]);

        let expected = app.blob_store.blob_url(CONTAINER, "sunset.png").unwrap();
        assert_eq!(newest.url, expected.as_str());

        let blob = app.get(expected.path()).await;
        assert_eq!(blob.status, 200);
        assert_eq!(blob.text, "png-bytes");
        assert_eq!(blob.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn same_name_replaces_blob() {
        let app = TestApp::spawn().await;

        let first = TestApp::upload_form("One", "", "photo.png", b"first");
        assert_eq!(app.post_multipart(routes::UPLOAD, first).await.status, 303);
        let second = TestApp::upload_form("Two", "", "photo.png", b"second");
        assert_eq!(app.post_multipart(routes::UPLOAD, second).await.status, 303);

        let images = app.images.get_all().await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, images[1].url);

        let path = app.blob_store.blob_url(CONTAINER, "photo.png").unwrap();
        assert_eq!(app.get(path.path()).await.text, "second");
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new()
            .text("title", "Sunset")
            .text("tags", "beach");
        let res = app.post_multipart(routes::UPLOAD, form).await;
        assert_eq!(res.status, 400);
        assert!(app.images.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;

        let form = TestApp::upload_form("Sunset", "beach", "sunset.png", b"");
        let res = app.post_multipart(routes::UPLOAD, form).await;
        assert_eq!(res.status, 400);
        assert!(app.images.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;

        let data = vec![0u8; 1024 * 1024 + 1];
        let form = TestApp::upload_form("Big", "", "big.png", &data);
        let res = app.post_multipart(routes::UPLOAD, form).await;
        assert_eq!(res.status, 400);
        assert!(app.images.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unusable_file_name_is_rejected() {
        let app = TestApp::spawn().await;

        let form = TestApp::upload_form("Dots", "", "..", b"data");
        let res = app.post_multipart(routes::UPLOAD, form).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn throttled_storage_fails_without_recording() {
        let app = TestApp::spawn_with(StoreKind::AlwaysThrottled, |images| images).await;

        let form = TestApp::upload_form("Sunset", "beach, evening", "sunset.png", b"png-bytes");
        let res = app.post_multipart(routes::UPLOAD, form).await;
        assert_eq!(res.status, 500);
        assert!(res.text.contains("An unexpected error occurred"));
        assert!(app.images.get_all().await.unwrap().is_empty());
    }
}
