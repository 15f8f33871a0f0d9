use std::collections::HashSet;

use crate::common::{TestApp, routes};

const FOLDER_ID: &str = "000000000000000000000000000000F1";

fn note_text(id: &str, parent_id: &str, title: &str) -> Vec<u8> {
    format!(
        "{title}\n\nSome body\n\nid: {id}\nparent_id: {parent_id}\nencryption_applied: 0\ntype_: 1"
    )
    .into_bytes()
}

mod content {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app
            .put_bytes(
                &routes::content("root:/locks/1.json:"),
                b"Content for :locks/1.json",
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.body["name"], "locks/1.json");
        assert_eq!(res.body["content_size"], 25);
        assert_eq!(res.body["mime_type"], "application/json");
        assert_eq!(res.body["domain_type"], "unknown");

        let res = app
            .get_with_token(&routes::content("root:/locks/1.json:"), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"Content for :locks/1.json");
        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn put_replaces_existing_content() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let first = app.put_item("root:/a.txt:", b"first", &token).await;
        let second = app.put_item("root:/a.txt:", b"second version", &token).await;
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["content_size"], 14);

        let res = app
            .get_with_token(&routes::content("root:/a.txt:"), &token)
            .await;
        assert_eq!(res.bytes, b"second version");
    }

    #[tokio::test]
    async fn post_creates_then_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app
            .post_bytes(&routes::content("root:/new.txt:"), b"hello", &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text());
        assert_eq!(res.body["name"], "new.txt");

        let res = app
            .post_bytes(&routes::content("root:/new.txt:"), b"again", &token)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn etag_allows_conditional_get() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        let item = app.put_item("root:/cached.txt:", b"cache me", &token).await;
        let etag = format!("\"{}\"", item["content_hash"].as_str().unwrap());

        let res = app
            .get_with_token(&routes::content("root:/cached.txt:"), &token)
            .await;
        assert_eq!(res.header("etag"), Some(etag.as_str()));

        let res = app
            .get_with_headers(
                &routes::content("root:/cached.txt:"),
                &token,
                &[("If-None-Match", &etag)],
            )
            .await;
        assert_eq!(res.status, 304);
        assert!(res.bytes.is_empty());

        let res = app
            .get_with_headers(
                &routes::content("root:/cached.txt:"),
                &token,
                &[("If-None-Match", "\"stale\"")],
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"cache me");
    }

    #[tokio::test]
    async fn content_type_header_overrides_mime() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app
            .put_typed(
                &routes::content("root:/data:"),
                b"a,b",
                "text/csv",
                &token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["mime_type"], "text/csv");

        let res = app
            .put_typed(
                &routes::content("root:/data:"),
                b"a,b",
                "application/octet-stream",
                &token,
            )
            .await;
        assert_eq!(res.body["mime_type"], "application/octet-stream");
    }

    #[tokio::test]
    async fn oversized_content_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app
            .put_bytes(
                &routes::content("root:/big.bin:"),
                &vec![0u8; 1024 * 1024 + 16],
                &token,
            )
            .await;
        assert_eq!(res.status, 413);
    }

    #[tokio::test]
    async fn missing_item_is_404() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app
            .get_with_token(&routes::content("root:/missing:"), &token)
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod metadata {
    use super::*;

    #[tokio::test]
    async fn note_fields_are_indexed() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        let path = "root:/00000000000000000000000000000001.md:";

        app.put_item(
            path,
            &note_text("00000000000000000000000000000001", FOLDER_ID, "Shopping"),
            &token,
        )
        .await;

        let res = app.get_with_token(&routes::item(path), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["domain_type"], "note");
        assert_eq!(res.body["domain_id"], "00000000000000000000000000000001");
        assert_eq!(res.body["domain_parent_id"], FOLDER_ID);
        assert_eq!(res.body["domain_title"], "Shopping");
        assert_eq!(res.body["encryption_applied"], false);

        app.put_item(
            path,
            &note_text("00000000000000000000000000000001", FOLDER_ID, "Groceries"),
            &token,
        )
        .await;

        let res = app.get_with_token(&routes::item(path), &token).await;
        assert_eq!(res.body["domain_title"], "Groceries");
        assert_eq!(res.body["name"], "00000000000000000000000000000001.md");
    }

    #[tokio::test]
    async fn malformed_paths_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        for path in ["notroot:/a:", "root:/a", "root:/a//b:", "root:/a/*:"] {
            let res = app.get_with_token(&routes::item(path), &token).await;
            assert_eq!(res.status, 400, "{path}: {}", res.text());
            assert_eq!(res.body["code"], "INVALID_PATH", "{path}");
        }

        let res = app
            .put_bytes(&routes::content("root"), b"x", &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_PATH");
    }

    #[tokio::test]
    async fn unsupported_method_on_metadata_route() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app.put_bytes(&routes::item("root:/a:"), b"x", &token).await;
        assert_eq!(res.status, 405);
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn token_required() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::item("root:/a:")).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");

        let res = app
            .get_with_token(&routes::item("root:/a:"), "not-a-jwt")
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn owners_do_not_see_each_other() {
        let app = TestApp::spawn().await;
        let alice = app.token("alice");
        let bob = app.token("bob");

        app.put_item("root:/private.txt:", b"alice only", &alice).await;

        let res = app
            .get_with_token(&routes::content("root:/private.txt:"), &bob)
            .await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(&routes::children("root"), &bob).await;
        assert!(res.item_names().is_empty());
    }
}

mod children {
    use super::*;

    #[tokio::test]
    async fn six_items_in_pages_of_four() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        for i in 1..=6 {
            app.put_item(&format!("root:/{i}.md:"), b"x", &token).await;
        }

        let res = app
            .get_with_token(&format!("{}?limit=4", routes::children("root:/*:")), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.item_names(), ["1.md", "2.md", "3.md", "4.md"]);
        assert_eq!(res.body["has_more"], true);
        let cursor = res.body["cursor"].as_str().unwrap().to_string();

        let res = app
            .get_with_token(
                &format!("{}?cursor={cursor}", routes::children("root:/*:")),
                &token,
            )
            .await;
        assert_eq!(res.item_names(), ["5.md", "6.md"]);
        assert_eq!(res.body["has_more"], false);
        assert!(res.body["cursor"].is_null());
    }

    #[tokio::test]
    async fn pagination_visits_each_child_once() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        for i in 0..11 {
            app.put_item(&format!("root:/locks/{i}.json:"), b"x", &token)
                .await;
        }

        let mut seen = HashSet::new();
        let mut pages = 0;
        let mut cursor: Option<String> = None;
        loop {
            let mut url = format!("{}?limit=3", routes::children("root:/locks:"));
            if let Some(c) = &cursor {
                url.push_str(&format!("&cursor={c}"));
            }
            let res = app.get_with_token(&url, &token).await;
            assert_eq!(res.status, 200);
            pages += 1;
            for name in res.item_names() {
                assert!(seen.insert(name.clone()), "duplicate {name}");
            }
            if res.body["has_more"] == false {
                break;
            }
            cursor = res.body["cursor"].as_str().map(str::to_string);
        }

        assert_eq!(seen.len(), 11);
        assert_eq!(pages, 4);
    }

    #[tokio::test]
    async fn wildcard_excludes_nested_items() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        for path in [
            "root:/locks/1.json:",
            "root:/locks/2.json:",
            "root:/locks/sub/3.json:",
            "root:/other/4.json:",
        ] {
            app.put_item(path, b"x", &token).await;
        }

        let res = app
            .get_with_token(&routes::children("root:/locks/*:"), &token)
            .await;
        assert_eq!(res.item_names(), ["locks/1.json", "locks/2.json"]);

        let res = app.get_with_token(&routes::children("root"), &token).await;
        assert!(res.item_names().is_empty());
    }

    #[tokio::test]
    async fn invalid_limit_and_cursor() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");

        let res = app
            .get_with_token(&format!("{}?limit=0", routes::children("root")), &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .get_with_token(&format!("{}?limit=1001", routes::children("root")), &token)
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .get_with_token(
                &format!("{}?cursor=deadbeef", routes::children("root")),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_CURSOR");
    }

    #[tokio::test]
    async fn malformed_query_is_json_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        app.put_item("root:/a.txt:", b"x", &token).await;

        for query in ["limit=abc", "limit=-1"] {
            let res = app
                .get_with_token(&format!("{}?{query}", routes::children("root")), &token)
                .await;
            assert_eq!(res.status, 400, "{query}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR", "{query}: {}", res.text());
        }

        // Metadata and content reads ignore the listing parameters.
        let res = app
            .get_with_token(&format!("{}?limit=abc", routes::item("root:/a.txt:")), &token)
            .await;
        assert_eq!(res.status, 200);
        let res = app
            .get_with_token(&format!("{}?limit=abc", routes::content("root:/a.txt:")), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"x");
    }

    #[tokio::test]
    async fn cursor_bound_to_listing() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        for i in 0..3 {
            app.put_item(&format!("root:/a/{i}:"), b"x", &token).await;
            app.put_item(&format!("root:/b/{i}:"), b"x", &token).await;
        }

        let res = app
            .get_with_token(&format!("{}?limit=1", routes::children("root:/a:")), &token)
            .await;
        let cursor = res.body["cursor"].as_str().unwrap().to_string();

        let res = app
            .get_with_token(
                &format!("{}?cursor={cursor}", routes::children("root:/b:")),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_CURSOR");

        let other = app.token("someone-else");
        let res = app
            .get_with_token(
                &format!("{}?cursor={cursor}", routes::children("root:/a:")),
                &other,
            )
            .await;
        assert_eq!(res.status, 400);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_single_item() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        app.put_item("root:/a.txt:", b"x", &token).await;
        app.put_item("root:/b.txt:", b"x", &token).await;

        let res = app
            .delete_with_token(&routes::item("root:/a.txt:"), &token)
            .await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::children("root"), &token).await;
        assert_eq!(res.item_names(), ["b.txt"]);

        let res = app
            .delete_with_token(&routes::item("root:/a.txt:"), &token)
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_directory_subtree() {
        let app = TestApp::spawn().await;
        let token = app.token("user1");
        for path in [
            "root:/dir/a:",
            "root:/dir/b/c:",
            "root:/dirt:",
        ] {
            app.put_item(path, b"x", &token).await;
        }

        let res = app.delete_with_token(&routes::item("root:/dir:"), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::children("root"), &token).await;
        assert_eq!(res.item_names(), ["dirt"]);

        let res = app.delete_with_token(&routes::item("root:/dir:"), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_root_spares_other_owners() {
        let app = TestApp::spawn().await;
        let alice = app.token("alice");
        let bob = app.token("bob");
        for path in ["root:/x:", "root:/y/z:"] {
            app.put_item(path, b"alice", &alice).await;
            app.put_item(path, b"bob", &bob).await;
        }

        let res = app.delete_with_token(&routes::item("root"), &alice).await;
        assert_eq!(res.status, 204);
        let res = app.delete_with_token(&routes::item("root"), &alice).await;
        assert_eq!(res.status, 204);

        let res = app
            .get_with_token(&routes::content("root:/y/z:"), &alice)
            .await;
        assert_eq!(res.status, 404);

        let res = app
            .get_with_token(&routes::content("root:/y/z:"), &bob)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"bob");
    }
}
