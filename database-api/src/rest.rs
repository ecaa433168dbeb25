use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client as HttpClient, Method, RequestBuilder};
use tracing as log;
use url::Url;

use super::*;

const REST_PATH: &str = "rest/v1/";
const RETURN_REPRESENTATION: &str = "return=representation";

pub struct ClientParams {
    pub url: Url,
    pub key: Box<str>,
}

/// Client for a PostgREST endpoint, as exposed by hosted Postgres services.
///
/// Every request authenticates with the project key, sent both as `apikey`
/// and as a bearer token.
pub struct RestDatabase {
    base: Url,
    key: Box<str>,
    http: HttpClient,
}

impl RestDatabase {
    pub fn new(params: ClientParams) -> Result<Self, DatabaseError> {
        Self::with_client(params, HttpClient::new())
    }

    pub fn with_client(params: ClientParams, http: HttpClient) -> Result<Self, DatabaseError> {
        let mut base = params.url;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base: base.join(REST_PATH)?,
            key: params.key,
            http,
        })
    }

    pub fn table_url(&self, table: &str, params: &[(String, String)]) -> Result<Url, DatabaseError> {
        let mut url = self.base.join(table)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &*self.key)
            .bearer_auth(&self.key)
    }

    async fn execute<T, F>(&self, request: RequestBuilder, handler: F) -> Result<T, DatabaseError>
    where
        T: Sized + Send,
        F: FnOnce(Bytes) -> Result<T, DatabaseError>,
    {
        let request = request.build()?;
        log::debug!("{} {}", request.method(), request.url().path());

        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.bytes().await?;

        if status.is_success() {
            handler(body)
        } else {
            let err = DatabaseError::from_response(status, &body);
            log::debug!("Request failed with status {}: {}", status, err);
            Err(err)
        }
    }
}

fn parse_rows(body: Bytes) -> Result<Vec<Row>, DatabaseError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&body)?)
}

fn filter_params(filters: &[Filter]) -> impl Iterator<Item = (String, String)> + '_ {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", render_value(&f.value))))
}

/// Query string of a select request, in PostgREST syntax.
pub fn select_params(query: &Select) -> Vec<(String, String)> {
    let columns = if query.columns.is_empty() {
        "*".to_owned()
    } else {
        query.columns.join(",")
    };

    let mut params = vec![("select".to_owned(), columns)];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_owned(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_owned(), limit.to_string()));
    }
    params
}

#[async_trait]
impl Database for RestDatabase {
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        let url = self.table_url(table, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&rows);
        self.execute(request, parse_rows).await
    }

    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, DatabaseError> {
        let url = self.table_url(table, &select_params(query))?;
        self.execute(self.request(Method::GET, url), parse_rows).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, DatabaseError> {
        let params: Vec<_> = filter_params(filters).collect();
        let url = self.table_url(table, &params)?;
        let request = self
            .request(Method::DELETE, url)
            .header("Prefer", RETURN_REPRESENTATION);
        self.execute(request, |b| Ok(parse_rows(b)?.len() as u64)).await
    }
}
