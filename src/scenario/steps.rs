use serde_json::json;
use tracing::debug;
use url::form_urlencoded;

use crate::{
    http::ApiClient,
    model::{Exchange, RequestDescriptor, ResponseSnapshot},
    recorder::record_exchange,
    report::Reporter,
};

use super::{
    assertions::{
        expect_container, expect_field_eq, expect_field_present, expect_ids_subset, expect_json,
        expect_status,
    },
    ScenarioError, ScenarioKind,
};

const OBJECTS_PATH: &str = "/objects";
const DATA_PATH: &str = "/data";
const FILTER_IDS: &[u32] = &[3, 5, 10];

/// Sends requests for one scenario and records each exchange before the
/// scenario gets to look at the response.
pub struct ScenarioContext<'a> {
    client: &'a ApiClient,
    reporter: &'a mut dyn Reporter,
    exchanges: Vec<Exchange>,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(client: &'a ApiClient, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            client,
            reporter,
            exchanges: Vec::new(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        self.client
    }

    pub async fn exchange(
        &mut self,
        request: RequestDescriptor,
    ) -> Result<ResponseSnapshot, ScenarioError> {
        let response = self.client.send(&request).await?;
        record_exchange(&mut *self.reporter, &request, &response)?;
        self.exchanges.push(Exchange {
            request,
            response: response.clone(),
        });
        Ok(response)
    }

    pub fn into_exchanges(self) -> Vec<Exchange> {
        self.exchanges
    }
}

pub async fn run_scenario(
    kind: ScenarioKind,
    ctx: &mut ScenarioContext<'_>,
) -> Result<(), ScenarioError> {
    match kind {
        ScenarioKind::GetData => get_data(ctx).await,
        ScenarioKind::ListObjects => list_objects(ctx).await,
        ScenarioKind::ListObjectsByIds => list_objects_by_ids(ctx).await,
        ScenarioKind::CreateData => create_data(ctx).await,
    }
}

async fn get_data(ctx: &mut ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let request = ctx.client().descriptor("GET", OBJECTS_PATH);
    let response = ctx.exchange(request).await?;

    let data = expect_json(&response)?;
    debug!(%data, "objects payload");
    Ok(())
}

async fn list_objects(ctx: &mut ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let request = ctx.client().descriptor("GET", OBJECTS_PATH);
    let response = ctx.exchange(request).await?;

    expect_status(&response, 200)?;
    let data = expect_json(&response)?;
    expect_container(&data)?;
    Ok(())
}

async fn list_objects_by_ids(ctx: &mut ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let request = ctx.client().descriptor("GET", &filtered_objects_path(FILTER_IDS));
    let response = ctx.exchange(request).await?;

    expect_status(&response, 200)?;
    let data = expect_json(&response)?;
    expect_ids_subset(&data, FILTER_IDS)?;
    Ok(())
}

async fn create_data(ctx: &mut ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let payload = json!({
        "name": "Sample Item",
        "value": 100
    });
    let request = ctx
        .client()
        .descriptor("POST", DATA_PATH)
        .json(payload.clone());
    let response = ctx.exchange(request).await?;

    expect_status(&response, 201)?;
    let data = expect_json(&response)?;
    expect_field_eq(&data, "name", &payload["name"])?;
    expect_field_eq(&data, "value", &payload["value"])?;
    expect_field_present(&data, "id")?;
    Ok(())
}

fn filtered_objects_path(ids: &[u32]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(ids.iter().map(|id| ("id", id.to_string())))
        .finish();
    format!("{OBJECTS_PATH}?{query}")
}
