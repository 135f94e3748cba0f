use serde::Deserialize;

use crate::client::LinearClient;
use crate::error::Result;
use crate::types::Viewer;

const VIEWER_QUERY: &str = r#"
query Viewer {
    viewer {
        id
        name
        email
        displayName
    }
}
"#;

#[derive(Deserialize)]
struct ViewerResponse {
    viewer: Viewer,
}

pub async fn fetch(client: &LinearClient, token: Option<&str>) -> Result<Viewer> {
    let response: ViewerResponse = client.query(VIEWER_QUERY, None, token).await?;
    Ok(response.viewer)
}
