use crate::routes::{genie, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "genie-server",
    description = "Credential-injecting proxy for the Genie conversation API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(genie::GenieApi::openapi());
    root
}
