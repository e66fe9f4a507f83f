use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::{
    catalog::{CategoryTree, ProductPage, ProductQuery, Seller},
    characteristics::{self, CharacteristicMap, CharacteristicScope, CharacteristicSource},
    error::{Error, ResolutionError, Result},
    review::{self, Credential, NewReview, Review, ReviewId, ReviewReply},
    settings::Backend,
};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const CATEGORIES_PATH: &str = "characteristics/categories/";
const CUSTOM_CHARACTERISTICS_PATH: &str = "characteristics/custom";
const CUSTOM_CHARACTERISTICS_ALT_PATH: &str = "characteristics/custom/";
const SELLERS_PATH: &str = "characteristics/sellers/";

/// Typed access to the storefront backend.
#[derive(Clone, Debug)]
pub struct StoreClient {
    client: Client,
    base_url: Url,
}

impl StoreClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(APP_USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url_with_slash(base_url)?,
        })
    }

    pub fn from_settings(backend: &Backend) -> Result<Self> {
        Self::new(
            &backend.base_url,
            backend.timeout_secs.map(Duration::from_secs),
        )
    }

    pub async fn categories(&self) -> Result<CategoryTree> {
        let resp = self.request(Method::GET, CATEGORIES_PATH)?.send().await?;
        json(resp).await
    }

    pub async fn sellers(&self, subcategory_id: i64) -> Result<Vec<Seller>> {
        let resp = self
            .request(Method::GET, SELLERS_PATH)?
            .query(&[("subcategoryId", subcategory_id)])
            .send()
            .await?;
        json(resp).await
    }

    /// Runs the characteristics fallback chain against this backend.
    pub async fn resolve_characteristics(
        &self,
        scope: &CharacteristicScope,
    ) -> Result<CharacteristicMap, ResolutionError> {
        characteristics::resolve(self, scope).await
    }

    pub async fn search_products(
        &self,
        query: &ProductQuery,
        page: u32,
        size: u32,
    ) -> Result<ProductPage> {
        let resp = self
            .request(Method::POST, &format!("products/page/{page}"))?
            .query(&[("page", page), ("size", size)])
            .json(query)
            .send()
            .await?;
        json(resp).await
    }

    /// Flat reviews of a product; see [`review::build_tree`].
    pub async fn reviews(&self, product_id: i64) -> Result<Vec<Review>> {
        let resp = self
            .request(Method::GET, &format!("reviews/product/{product_id}"))?
            .send()
            .await?;
        json(resp).await
    }

    /// Reviews of a product arranged into reply trees.
    pub async fn review_tree(&self, product_id: i64) -> Result<Vec<Review>> {
        let flat = self.reviews(product_id).await?;
        let total = flat.len();
        let roots = review::build_tree(flat);
        debug!("Built {} review threads from {total} reviews", roots.len());
        Ok(roots)
    }

    pub async fn create_review(
        &self,
        review: &NewReview,
        credential: Option<&Credential>,
    ) -> Result<Review> {
        let token = token(credential)?;
        review.validate()?;
        let resp = self
            .request(Method::POST, "reviews/create")?
            .query(&[("token", token)])
            .json(review)
            .send()
            .await?;
        let created: Review = json(resp).await?;
        info!("Created review {} for product {}", created.id, review.product_id);
        Ok(created)
    }

    pub async fn reply_to_review(
        &self,
        reply: &ReviewReply,
        credential: Option<&Credential>,
    ) -> Result<Review> {
        let token = token(credential)?;
        let resp = self
            .request(Method::POST, "reviews/reply")?
            .query(&[("token", token)])
            .json(reply)
            .send()
            .await?;
        let created: Review = json(resp).await?;
        info!("Replied to review {} with {}", reply.parent_id, created.id);
        Ok(created)
    }

    pub async fn delete_review(
        &self,
        review_id: ReviewId,
        credential: Option<&Credential>,
    ) -> Result<()> {
        let token = token(credential)?;
        let resp = self
            .request(Method::DELETE, &format!("reviews/{review_id}"))?
            .query(&[("token", token)])
            .send()
            .await?;
        check(resp).await?;
        info!("Deleted review {review_id}");
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self.client.request(method, url))
    }
}

#[async_trait]
impl CharacteristicSource for StoreClient {
    async fn custom_characteristics(
        &self,
        scope: &CharacteristicScope,
    ) -> Result<CharacteristicMap> {
        let resp = self
            .request(Method::POST, CUSTOM_CHARACTERISTICS_PATH)?
            .json(scope)
            .send()
            .await?;
        json(resp).await
    }

    async fn custom_characteristics_alternate(
        &self,
        scope: &CharacteristicScope,
    ) -> Result<CharacteristicMap> {
        let resp = self
            .request(Method::POST, CUSTOM_CHARACTERISTICS_ALT_PATH)?
            .json(scope)
            .send()
            .await?;
        json(resp).await
    }

    async fn subcategory_characteristics(&self, subcategory_id: i64) -> Result<CharacteristicMap> {
        let resp = self
            .request(Method::GET, CUSTOM_CHARACTERISTICS_PATH)?
            .query(&[("subcategoryId", subcategory_id)])
            .send()
            .await?;
        json(resp).await
    }
}

fn token(credential: Option<&Credential>) -> Result<&str> {
    match credential {
        Some(credential) if !credential.is_blank() => Ok(credential.token()),
        _ => Err(Error::AuthRequired),
    }
}

// `Url::join` replaces the last path segment unless the base ends in '/'.
fn base_url_with_slash(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::transport(status, &body))
}

async fn json<T>(resp: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    Ok(check(resp).await?.json().await?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::filter::FilterDraft;

    fn client(server: &MockServer) -> StoreClient {
        StoreClient::new(&server.uri(), None).unwrap()
    }

    fn colors() -> serde_json::Value {
        json!({ "Color": ["Red", "Blue"] })
    }

    #[test]
    fn base_url_keeps_prefix() {
        let url = base_url_with_slash("http://shop.test/api").unwrap();
        assert_eq!(
            url.join(CUSTOM_CHARACTERISTICS_PATH).unwrap().as_str(),
            "http://shop.test/api/characteristics/custom"
        );
        let url = base_url_with_slash("http://shop.test/api/").unwrap();
        assert_eq!(url.as_str(), "http://shop.test/api/");
    }

    #[tokio::test]
    async fn primary_route_answers_alone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/characteristics/custom"))
            .and(body_json(json!({ "subcategoryId": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(colors()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/characteristics/custom/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let scope = CharacteristicScope::default().with_subcategory(5);
        let map = client(&server).resolve_characteristics(&scope).await.unwrap();
        assert_eq!(map["Color"], vec!["Red", "Blue"]);
    }

    #[tokio::test]
    async fn trailing_slash_route_is_tried_second() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/characteristics/custom"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/characteristics/custom/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(colors()))
            .expect(1)
            .mount(&server)
            .await;

        let scope = CharacteristicScope::default().with_name("lamp");
        let map = client(&server).resolve_characteristics(&scope).await.unwrap();
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_surfaces_alternate_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/characteristics/custom"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such route"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/characteristics/custom/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "bad scope" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/characteristics/custom"))
            .and(query_param("subcategoryId", "5"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
            .expect(1)
            .mount(&server)
            .await;

        let scope = CharacteristicScope::default().with_subcategory(5);
        let err = client(&server)
            .resolve_characteristics(&scope)
            .await
            .unwrap_err();
        assert!(matches!(
            err.cause(),
            Error::Transport { status, message }
                if *status == reqwest::StatusCode::BAD_REQUEST && message == "bad scope"
        ));
        assert_eq!(
            err.subcategory_attempt().map(ToString::to_string),
            Some("database down".to_string())
        );
    }

    #[tokio::test]
    async fn search_posts_filter_with_paging() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/products/page/2"))
            .and(query_param("page", "2"))
            .and(query_param("size", "20"))
            .and(body_json(json!({
                "name": "lamp",
                "lowerPriceBound": null,
                "upperPriceBound": 150.0,
                "characteristics": null,
                "sortField": null,
                "sortDir": null,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "id": 1, "name": "Desk lamp", "price": 30.0 }],
                "totalElements": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut draft = FilterDraft::default();
        draft.set_lower_price(0.0);
        draft.set_upper_price(150.0);
        let query = ProductQuery::new(Some("lamp".to_string()), draft.canonical());
        let page = client(&server).search_products(&query, 2, 20).await.unwrap();
        assert_eq!(page.content[0].name, "Desk lamp");
    }

    #[tokio::test]
    async fn review_tree_from_flat_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reviews/product/40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "description": "Great", "stars": 5, "date": "2024-01-01", "parentId": null },
                { "id": 2, "description": "Agreed", "stars": 0, "date": "2024-01-02", "parentId": 1 },
                { "id": 4, "description": "Lost", "stars": 0, "date": "2024-01-03", "parentId": 99 }
            ])))
            .mount(&server)
            .await;

        let tree = client(&server).review_tree(40).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].description, "Agreed");
    }

    #[tokio::test]
    async fn mutations_without_credential_send_nothing() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let new_review = NewReview {
            product_id: 1,
            description: "Nice".to_string(),
            stars: 4,
        };
        let reply = ReviewReply {
            product_id: 1,
            parent_id: 3,
            description: "Thanks".to_string(),
        };
        let blank = Credential::new("");

        assert!(matches!(
            client.create_review(&new_review, None).await,
            Err(Error::AuthRequired)
        ));
        assert!(matches!(
            client.reply_to_review(&reply, Some(&blank)).await,
            Err(Error::AuthRequired)
        ));
        assert!(matches!(
            client.delete_review(3, None).await,
            Err(Error::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn token_travels_as_query_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reviews/reply"))
            .and(query_param("token", "abc123"))
            .and(body_json(json!({ "productId": 1, "parentId": 3, "description": "Thanks" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 8, "description": "Thanks", "stars": 0, "date": "2024-05-01", "parentId": 3
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/reviews/8"))
            .and(query_param("token", "abc123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let credential = Credential::new("abc123");
        let reply = ReviewReply {
            product_id: 1,
            parent_id: 3,
            description: "Thanks".to_string(),
        };
        let created = client
            .reply_to_review(&reply, Some(&credential))
            .await
            .unwrap();
        assert_eq!(created.parent_id, Some(3));
        client.delete_review(8, Some(&credential)).await.unwrap();
    }

    #[tokio::test]
    async fn failed_mutation_carries_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reviews/create"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "message": "Token expired" })),
            )
            .mount(&server)
            .await;

        let new_review = NewReview {
            product_id: 1,
            description: "Nice".to_string(),
            stars: 4,
        };
        let err = client(&server)
            .create_review(&new_review, Some(&Credential::new("old")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Token expired");
    }

    #[tokio::test]
    async fn sellers_and_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/characteristics/sellers/"))
            .and(query_param("subcategoryId", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "name": "Acme", "slug": "acme" },
                { "id": 2, "name": "Globex" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/characteristics/categories/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Lighting": [{ "id": 3, "name": "Lamps" }]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let sellers = client.sellers(3).await.unwrap();
        assert_eq!(sellers[1].slug, None);
        let categories = client.categories().await.unwrap();
        assert_eq!(categories["Lighting"][0].name, "Lamps");
    }
}
