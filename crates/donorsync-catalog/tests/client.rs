//! REST client tests against a mock remote catalog.

use donorsync_catalog::api::CatalogApi;
use donorsync_catalog::client::RestCatalogClient;
use donorsync_catalog::error::CatalogError;
use donorsync_catalog::types::{ProductPayload, VariantPayload};

use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RestCatalogClient {
    RestCatalogClient::with_base_url(&server.uri(), "ck_test", "cs_test", 5, "donorsync-test/0.1", 0, 0)
        .expect("client should build")
}

fn client_with_retries(server: &MockServer, retries: u32) -> RestCatalogClient {
    RestCatalogClient::with_base_url(
        &server.uri(),
        "ck_test",
        "cs_test",
        5,
        "donorsync-test/0.1",
        retries,
        0,
    )
    .expect("client should build")
}

fn product_payload(name: &str, sku: &str) -> ProductPayload {
    ProductPayload {
        name: name.to_owned(),
        kind: "simple".to_owned(),
        status: "draft".to_owned(),
        sku: Some(sku.to_owned()),
        regular_price: Some("250".to_owned()),
        sale_price: None,
        description: None,
        images: vec![],
        categories: vec![],
        brands: vec![],
        attributes: vec![],
        default_attributes: vec![],
        meta_data: vec![],
    }
}

#[tokio::test]
async fn requests_authenticate_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products/attributes"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let found = client(&server).find_attribute("pa_obyem").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn find_attribute_filters_by_slug() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products/attributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 3, "name": "Обʼєм", "slug": "pa_obyem" },
            { "id": 4, "name": "Колір", "slug": "pa_color" }
        ])))
        .mount(&server)
        .await;

    let attribute = client(&server)
        .find_attribute("pa_obyem")
        .await
        .unwrap()
        .expect("attribute should be found");
    assert_eq!(attribute.id, 3);
    assert_eq!(attribute.name, "Обʼєм");
}

#[tokio::test]
async fn find_category_matches_slug_and_parent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products/categories"))
        .and(query_param("slug", "zhinocha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 10, "name": "Жіноча", "slug": "zhinocha", "parent": 2 },
            { "id": 11, "name": "Жіноча", "slug": "zhinocha", "parent": 5 }
        ])))
        .mount(&server)
        .await;

    let category = client(&server)
        .find_category("zhinocha", 5)
        .await
        .unwrap()
        .expect("category under parent 5 should match");
    assert_eq!(category.id, 11);

    let missing = client(&server).find_category("zhinocha", 99).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn create_product_posts_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products"))
        .and(body_partial_json(serde_json::json!({
            "name": "Parfum Lux",
            "type": "simple",
            "status": "draft",
            "sku": "PL"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 101, "sku": "PL", "status": "draft"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create_product(&product_payload("Parfum Lux", "PL"))
        .await
        .unwrap();
    assert_eq!(created.id, 101);
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/wp-json/wc/v3/products/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": "woocommerce_rest_product_invalid_id",
            "message": "Invalid ID."
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .update_product(999, &product_payload("Gone", "G"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[tokio::test]
async fn rejected_writes_carry_the_remote_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": "product_invalid_sku",
            "message": "Invalid or duplicated SKU."
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_product(&product_payload("Dup", "DUP"))
        .await
        .unwrap_err();
    match err {
        CatalogError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("SKU"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn list_variants_decodes_attribute_pairs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products/101/variations"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": 7,
                "sku": "PL-30",
                "regular_price": "250",
                "sale_price": "",
                "attributes": [{ "name": "pa_obyem", "option": "30 ml" }]
            }
        ])))
        .mount(&server)
        .await;

    let variants = client(&server).list_variants(101).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].id, 7);
    assert_eq!(variants[0].attributes[0].option, "30 ml");
}

#[tokio::test]
async fn update_variant_sends_only_payload_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/wp-json/wc/v3/products/101/variations/7"))
        .and(body_partial_json(serde_json::json!({ "regular_price": "260" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 7, "regular_price": "260"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = VariantPayload {
        regular_price: Some("260".to_owned()),
        ..VariantPayload::default()
    };
    let updated = client(&server).update_variant(101, 7, &payload).await.unwrap();
    assert_eq!(updated.id, 7);
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products/attributes"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products/attributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let found = client_with_retries(&server, 2)
        .find_attribute("pa_obyem")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/products"))
        .and(query_param("sku", "NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_with_retries(&server, 3)
        .find_product_by_sku("NOPE")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}
