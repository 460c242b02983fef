//! Round-trip tests through the facade.
//!
//! upload → get → list includes → delete → list excludes, against an
//! in-memory S3 protocol fake. The presigned delete is served by a
//! `mockito` endpoint that removes the object from the fake's state.

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use mockito::Server;

    use crate::storage::{
        BackendKind, Bucket, ClientError, CompletedPart, FileRef, ObjectPage, ObjectStoreBucket,
        ObjectStoreClient, PresignedRequest, StorageError, UploadRequest,
    };

    // ========================================================================
    // In-memory protocol fake
    // ========================================================================

    type Objects = Arc<Mutex<BTreeMap<String, Bytes>>>;

    #[derive(Debug)]
    struct PendingUpload {
        key: String,
        body: Option<(String, Bytes)>,
    }

    /// Keeps objects in memory and enforces the multipart protocol order.
    struct InMemoryObjectStore {
        objects: Objects,
        uploads: Mutex<HashMap<String, PendingUpload>>,
        next_upload: Mutex<u32>,
        endpoint: String,
        page_size: usize,
    }

    impl InMemoryObjectStore {
        fn new(endpoint: String) -> Self {
            Self {
                objects: Arc::default(),
                uploads: Mutex::default(),
                next_upload: Mutex::new(0),
                endpoint,
                page_size: 2,
            }
        }
    }

    impl ObjectStoreClient for InMemoryObjectStore {
        async fn list_objects(
            &self,
            _bucket: &str,
            continuation_token: Option<String>,
        ) -> Result<ObjectPage, ClientError> {
            let objects = self.objects.lock().unwrap();
            let keys: Vec<String> = objects
                .keys()
                .filter(|key| {
                    continuation_token
                        .as_deref()
                        .is_none_or(|after| key.as_str() > after)
                })
                .take(self.page_size + 1)
                .cloned()
                .collect();

            let truncated = keys.len() > self.page_size;
            let keys: Vec<String> = keys.into_iter().take(self.page_size).collect();
            Ok(ObjectPage {
                next_continuation_token: truncated.then(|| keys.last().cloned()).flatten(),
                keys: keys.into_iter().map(Some).collect(),
            })
        }

        async fn get_object(&self, _bucket: &str, key: &str) -> Result<Bytes, ClientError> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| ClientError::new("NoSuchKey").with_status(404))
        }

        async fn create_multipart_upload(
            &self,
            _bucket: &str,
            key: &str,
            _content_type: &str,
        ) -> Result<String, ClientError> {
            let mut next = self.next_upload.lock().unwrap();
            *next += 1;
            let upload_id = format!("upload-{next}");
            self.uploads.lock().unwrap().insert(
                upload_id.clone(),
                PendingUpload {
                    key: key.to_string(),
                    body: None,
                },
            );
            Ok(upload_id)
        }

        async fn upload_part(
            &self,
            _bucket: &str,
            key: &str,
            upload_id: &str,
            part_number: i32,
            body: Bytes,
        ) -> Result<String, ClientError> {
            let mut uploads = self.uploads.lock().unwrap();
            let pending = uploads
                .get_mut(upload_id)
                .filter(|pending| pending.key == key)
                .ok_or_else(|| ClientError::new("NoSuchUpload").with_status(404))?;

            let e_tag = format!("\"{part_number}-{}\"", body.len());
            pending.body = Some((e_tag.clone(), body));
            Ok(e_tag)
        }

        async fn complete_multipart_upload(
            &self,
            _bucket: &str,
            key: &str,
            upload_id: &str,
            parts: Vec<CompletedPart>,
        ) -> Result<(), ClientError> {
            let pending = self
                .uploads
                .lock()
                .unwrap()
                .remove(upload_id)
                .ok_or_else(|| ClientError::new("NoSuchUpload").with_status(404))?;

            let Some((e_tag, body)) = pending.body else {
                return Err(ClientError::new("InvalidPart").with_status(400));
            };
            if parts.len() != 1 || parts[0].e_tag != e_tag || pending.key != key {
                return Err(ClientError::new("InvalidPart").with_status(400));
            }

            self.objects.lock().unwrap().insert(key.to_string(), body);
            Ok(())
        }

        async fn abort_multipart_upload(
            &self,
            _bucket: &str,
            _key: &str,
            upload_id: &str,
        ) -> Result<(), ClientError> {
            self.uploads.lock().unwrap().remove(upload_id);
            Ok(())
        }

        async fn presign_delete(
            &self,
            bucket: &str,
            key: &str,
            expires_in: Duration,
        ) -> Result<PresignedRequest, ClientError> {
            Ok(PresignedRequest {
                url: format!(
                    "{}/{bucket}/{key}?X-Amz-Expires={}",
                    self.endpoint,
                    expires_in.as_secs()
                ),
                method: "DELETE".to_string(),
                headers: Vec::new(),
            })
        }
    }

    /// Serve `hits` presigned deletes for `key`, removing it from `objects`.
    async fn serve_delete(
        server: &mut Server,
        objects: &Objects,
        key: &str,
        hits: usize,
    ) -> mockito::Mock {
        let objects = Arc::clone(objects);
        let owned_key = key.to_string();
        server
            .mock("DELETE", format!("/media/{key}").as_str())
            .match_query(mockito::Matcher::UrlEncoded(
                "X-Amz-Expires".to_string(),
                "3600".to_string(),
            ))
            .with_status(204)
            .expect(hits)
            .with_body_from_request(move |_| {
                objects.lock().unwrap().remove(&owned_key);
                Vec::new()
            })
            .create_async()
            .await
    }

    // ========================================================================
    // Round trip
    // ========================================================================

    #[tokio::test]
    async fn test_upload_get_list_delete_round_trip() {
        let mut server = Server::new_async().await;
        let store = InMemoryObjectStore::new(server.url());
        let objects = Arc::clone(&store.objects);
        let bucket = Bucket::from_object_store(ObjectStoreBucket::with_client(store, "media"));
        assert_eq!(bucket.kind(), BackendKind::ObjectStore);

        let request =
            UploadRequest::new("abc", "mock-id", "image/webp").in_project("mock-project");
        let key = bucket.upload_file(request).await.expect("upload");
        assert_eq!(key, "mock-project/mock-id");

        let file = FileRef::new("mock-id").in_project("mock-project");
        assert_eq!(bucket.get_file(&file).await.expect("get"), key);
        assert!(bucket.list_files().await.expect("list").contains(&key));

        let delete = serve_delete(&mut server, &objects, &key, 2).await;
        bucket.delete_file(&file).await.expect("delete");
        assert!(!bucket.list_files().await.expect("list").contains(&key));

        // S3 answers 204 for a key that is already gone
        bucket.delete_file(&file).await.expect("repeated delete");
        delete.assert_async().await;

        let err = bucket.get_file(&file).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_delete_missing_key_keeps_backend_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/media/gone")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body("NoSuchKey")
            .create_async()
            .await;
        let store = InMemoryObjectStore::new(server.url());
        let bucket = Bucket::from_object_store(ObjectStoreBucket::with_client(store, "media"));

        let err = bucket.delete_file(&FileRef::new("gone")).await.unwrap_err();

        mock.assert_async().await;
        let StorageError::Backend(report) = &err else {
            panic!("expected backend error, got {err:?}");
        };
        assert_eq!(report.action, "delete_file");
        assert_eq!(report.status, Some(404));
    }

    #[tokio::test]
    async fn test_listing_spans_pages_in_key_order() {
        let server = Server::new_async().await;
        let store = InMemoryObjectStore::new(server.url());
        let bucket = Bucket::from_object_store(ObjectStoreBucket::with_client(store, "media"));

        for id in ["e", "a", "d", "b", "c"] {
            let request = UploadRequest::new(id, id, "text/plain").in_project("p");
            bucket.upload_file(request).await.expect("upload");
        }
        bucket
            .upload_file(UploadRequest::new("", "root", "text/plain"))
            .await
            .expect("upload");

        let keys = bucket.list_files().await.expect("list");
        assert_eq!(keys, vec!["p/a", "p/b", "p/c", "p/d", "p/e", "root"]);
    }

    #[tokio::test]
    async fn test_same_key_upload_replaces_object() {
        let server = Server::new_async().await;
        let store = InMemoryObjectStore::new(server.url());
        let objects = Arc::clone(&store.objects);
        let bucket = Bucket::from_object_store(ObjectStoreBucket::with_client(store, "media"));

        bucket
            .upload_file(UploadRequest::new("first", "a", "text/plain"))
            .await
            .expect("upload");
        bucket
            .upload_file(UploadRequest::new("second", "a", "text/plain"))
            .await
            .expect("upload");

        let objects = objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.get("a"), Some(&Bytes::from_static(b"second")));
    }
}
