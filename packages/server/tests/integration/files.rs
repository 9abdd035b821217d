use crate::common::{TestApp, jpeg_bytes, pdf_bytes, png_bytes, routes};

mod root {
    use super::*;

    #[tokio::test]
    async fn banner() {
        let app = TestApp::spawn().await;

        let res = app.get("/").await;

        assert_eq!(res.status, 200);
        assert!(!res.text.is_empty());
    }

    #[tokio::test]
    async fn openapi_document_lists_endpoints() {
        let app = TestApp::spawn().await;

        let res = app.get("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        let paths = &res.body["paths"];
        assert!(paths.get("/upload").is_some());
        assert!(paths.get("/files").is_some());
        assert!(paths.get("/files/{id}").is_some());
        assert!(paths.get("/download/{blob_id}").is_some());
    }
}

mod list_files {
    use super::*;

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::FILES).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn newest_first_with_download_urls() {
        let app = TestApp::spawn().await;
        let mut blob_ids = Vec::new();
        for (name, bytes, mime) in [
            ("first.jpg", jpeg_bytes(), "image/jpeg"),
            ("second.pdf", pdf_bytes(), "application/pdf"),
            ("third.png", png_bytes(), "image/png"),
        ] {
            let res = app.upload(name, bytes, Some(mime)).await;
            assert_eq!(res.status, 200, "Upload failed: {}", res.text);
            blob_ids.push(res.str_field("blobId").to_string());
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let res = app.get(routes::FILES).await;

        assert_eq!(res.status, 200);
        let files = res.body.as_array().unwrap();
        assert_eq!(files.len(), 3);
        let names: Vec<&str> = files
            .iter()
            .map(|f| f["originalName"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["third.png", "second.pdf", "first.jpg"]);
        assert_eq!(
            files[0]["downloadUrl"],
            format!("http://files.test/download/{}", blob_ids[2])
        );
        assert!(
            files[1]["compressedName"]
                .as_str()
                .unwrap()
                .ends_with("_compressed_second.pdf")
        );
    }
}

mod sizes {
    use super::*;

    #[tokio::test]
    async fn upload_and_listing_report_the_same_sizes() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        assert_eq!(upload.status, 200, "Upload failed: {}", upload.text);

        let listed = app.get(routes::FILES).await;
        let file = &listed.body[0];

        assert_eq!(file["id"], upload.body["fileId"]);
        for key in [
            "originalSize",
            "compressedSize",
            "originalSizeBytes",
            "compressedSizeBytes",
            "reductionPercent",
        ] {
            assert_eq!(
                file[key].as_f64(),
                upload.body[key].as_f64(),
                "{key} differs between upload and listing"
            );
        }
        assert_eq!(
            file["originalSize"].as_f64().unwrap(),
            file["originalSizeBytes"].as_f64().unwrap() / 1024.0
        );
    }
}

mod download_file {
    use super::*;

    #[tokio::test]
    async fn unknown_blob_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&routes::download("01936f0e-1234-7abc-8000-000000000001"))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_blob_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::download("not-a-uuid")).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn etag_round_trip() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let path = routes::download(upload.str_field("blobId"));

        let first = app.get(&path).await;
        let etag = first.header("etag").unwrap().to_string();
        assert_eq!(etag, format!("\"{}\"", upload.str_field("blobId")));
        assert_eq!(
            first.header("content-length"),
            Some(first.bytes.len().to_string().as_str())
        );

        let second = app.get_with_header(&path, "if-none-match", &etag).await;
        assert_eq!(second.status, 304);
        assert!(second.bytes.is_empty());
    }

    #[tokio::test]
    async fn weak_and_listed_etags_are_not_modified() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let blob_id = upload.str_field("blobId");
        let path = routes::download(blob_id);

        let weak = app
            .get_with_header(&path, "if-none-match", &format!("W/\"{blob_id}\""))
            .await;
        assert_eq!(weak.status, 304);

        let listed = app
            .get_with_header(&path, "if-none-match", &format!("\"stale\", \"{blob_id}\""))
            .await;
        assert_eq!(listed.status, 304);
        assert_eq!(listed.header("etag"), Some(format!("\"{blob_id}\"").as_str()));

        let other = app.get_with_header(&path, "if-none-match", "\"stale\"").await;
        assert_eq!(other.status, 200);
    }

    #[tokio::test]
    async fn revalidation_does_not_read_blob_bytes() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let blob_id = upload.str_field("blobId").to_string();
        let path = routes::download(&blob_id);
        let etag = app.get(&path).await.header("etag").unwrap().to_string();

        // Bytes no longer match the stored checksum; only a full read notices.
        let shard = &blob_id[blob_id.len() - 2..];
        std::fs::write(app.blob_dir.join(shard).join(&blob_id), b"tampered").unwrap();

        let cached = app.get_with_header(&path, "if-none-match", &etag).await;
        assert_eq!(cached.status, 304);

        let full = app.get(&path).await;
        assert_eq!(full.status, 500);
        assert_eq!(full.body["code"], "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn missing_blob_is_storage_inconsistency() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let blob_id = upload.str_field("blobId").to_string();

        std::fs::remove_dir_all(&app.blob_dir).unwrap();

        let res = app.get(&routes::download(&blob_id)).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "STORAGE_INCONSISTENCY");
    }
}

mod delete_file {
    use super::*;

    #[tokio::test]
    async fn delete_removes_record_and_blob() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let id = upload.str_field("fileId").to_string();
        let blob_id = upload.str_field("blobId").to_string();
        assert_eq!(app.blob_count(), 1);

        let res = app.delete(&routes::file(&id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id.as_str());
        assert!(res.body["message"].as_str().is_some());
        assert_eq!(app.blob_count(), 0);
        assert_eq!(app.record_count().await, 0);

        let download = app.get(&routes::download(&blob_id)).await;
        assert_eq!(download.status, 404);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let id = upload.str_field("fileId").to_string();

        assert_eq!(app.delete(&routes::file(&id)).await.status, 200);

        let res = app.delete(&routes::file(&id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn record_with_missing_blob_is_still_deleted() {
        let app = TestApp::spawn().await;
        let upload = app.upload("photo.jpg", jpeg_bytes(), Some("image/jpeg")).await;
        let id = upload.str_field("fileId").to_string();

        std::fs::remove_dir_all(&app.blob_dir).unwrap();

        let res = app.delete(&routes::file(&id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(app.record_count().await, 0);
    }
}
