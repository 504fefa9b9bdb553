use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes HTTP requests. Decorators implement this on top of an inner
/// client to rewrite the request before it goes out.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
