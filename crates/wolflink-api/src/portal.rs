// Portal endpoints
//
// System listing, online state, GUI description, live values and session
// close. Every call goes through the retrying pipeline in `client.rs`.

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::client::{PortalClient, RequestOptions};
use crate::error::Error;
use crate::flatten::flatten_views;
use crate::models::{Device, GuiDescription, Parameter, SystemState, Value, ValuesResponse};

const SYSTEM_LIST: &str = "api/portal/GetSystemList";
const SYSTEM_STATE_LIST: &str = "api/portal/GetSystemStateList";
const GUI_DESCRIPTION: &str = "api/portal/GetGuiDescriptionForGateway";
const PARAMETER_VALUES: &str = "api/portal/GetParameterValues";
const CLOSE_SYSTEM: &str = "api/portal/CloseSystem";

/// `errorMessage` the values endpoint sends when the device did not answer.
pub const READ_PARAMETER_ERROR: &str = "ReadParameterValues";

/// Bundle id the portal web UI uses for value polls.
const BUNDLE_ID: i64 = 1000;

/// A portal error body: any object carrying `errorCode` or `errorType`.
fn error_payload(body: &serde_json::Value) -> Option<&serde_json::Map<String, serde_json::Value>> {
    body.as_object()
        .filter(|obj| obj.contains_key("errorCode") || obj.contains_key("errorType"))
}

fn fetch_failed(payload: &serde_json::Value) -> Error {
    let message = payload
        .get("errorMessage")
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| format!("portal error: {payload}"), String::from);
    Error::FetchFailed {
        message,
        status: None,
        payload: Some(payload.clone()),
    }
}

/// Reject error payloads, then deserialize into `T`.
fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, Error> {
    if error_payload(&body).is_some() {
        return Err(fetch_failed(&body));
    }
    let raw = body.to_string();
    serde_json::from_value(body).map_err(|e| Error::deserialization(&e, &raw))
}

impl PortalClient {
    /// List the heating systems of the account.
    ///
    /// `GET api/portal/GetSystemList`
    pub async fn fetch_system_list(&self) -> Result<Vec<Device>, Error> {
        let body = self
            .execute(Method::GET, SYSTEM_LIST, RequestOptions::new())
            .await?;
        let systems: Vec<Device> = decode(body)?;
        debug!(count = systems.len(), "fetched systems");
        Ok(systems)
    }

    /// Whether the gateway of a system is online.
    ///
    /// `POST api/portal/GetSystemStateList`
    pub async fn fetch_system_state(&self, system_id: i64, gateway_id: i64) -> Result<bool, Error> {
        let options = RequestOptions::new().json_with_session(move |session| {
            json!({
                "sessionId": session.session_id,
                "systemList": [{ "systemId": system_id, "gatewayId": gateway_id }],
            })
        });
        let body = self
            .execute(Method::POST, SYSTEM_STATE_LIST, options)
            .await?;

        let states: Vec<SystemState> = decode(body)?;
        let state = states.into_iter().next().ok_or_else(|| Error::FetchFailed {
            message: format!("no state reported for system {system_id}"),
            status: None,
            payload: None,
        })?;
        debug!(system_id, online = state.gateway_state.is_online, "fetched system state");
        Ok(state.gateway_state.is_online)
    }

    /// Fetch the GUI description and flatten it into a parameter list.
    ///
    /// `GET api/portal/GetGuiDescriptionForGateway?GatewayId=&SystemId=`
    pub async fn fetch_parameters(
        &self,
        gateway_id: i64,
        system_id: i64,
    ) -> Result<Vec<Parameter>, Error> {
        let options = RequestOptions::new()
            .query("GatewayId", gateway_id)
            .query("SystemId", system_id);
        let body = self.execute(Method::GET, GUI_DESCRIPTION, options).await?;

        let description: GuiDescription = decode(body)?;
        let menu = description
            .menu_items
            .into_iter()
            .next()
            .ok_or_else(|| Error::FetchFailed {
                message: "GUI description has no menu items".into(),
                status: None,
                payload: None,
            })?;

        let parameters = flatten_views(&menu.tab_views);
        debug!(
            tabs = menu.tab_views.len(),
            parameters = parameters.len(),
            "fetched parameters"
        );
        Ok(parameters)
    }

    /// Poll live values for `parameters`.
    ///
    /// `POST api/portal/GetParameterValues`
    ///
    /// Sends the `lastAccess` marker from the previous poll of this session
    /// and stores the new one. Values the portal reports without a `value`
    /// are skipped.
    pub async fn fetch_values(
        &self,
        gateway_id: i64,
        system_id: i64,
        parameters: &[Parameter],
    ) -> Result<Vec<Value>, Error> {
        let value_ids: Vec<i64> = parameters.iter().map(Parameter::value_id).collect();
        let options = RequestOptions::new()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json_with_session(move |session| {
                json!({
                    "bundleId": BUNDLE_ID,
                    "bundle": false,
                    "valueIdList": value_ids,
                    "gatewayId": gateway_id,
                    "systemId": system_id,
                    "guiIdChanged": false,
                    "sessionId": session.session_id,
                    "lastAccess": session.last_access,
                })
            });

        let (body, session) = self
            .execute_with_session(&Method::POST, PARAMETER_VALUES, &options)
            .await?;

        if error_payload(&body).is_some() {
            let read_error = body
                .get("errorMessage")
                .and_then(serde_json::Value::as_str)
                == Some(READ_PARAMETER_ERROR);
            return Err(if read_error {
                Error::ParameterRead { payload: body }
            } else {
                fetch_failed(&body)
            });
        }

        let response: ValuesResponse = decode(body)?;
        self.session()
            .record_last_access(session.generation, response.last_access)
            .await;

        let values: Vec<Value> = response
            .values
            .into_iter()
            .filter_map(|raw| raw.into_value())
            .collect();
        debug!(count = values.len(), "fetched values");
        Ok(values)
    }

    /// Close the portal session. Best-effort.
    ///
    /// `POST api/portal/CloseSystem`
    ///
    /// Local token and session state is dropped either way, so the next call
    /// opens a fresh session. A failed close is logged, not returned. Without
    /// an open session this is a no-op.
    pub async fn close_system(&self) {
        if self.session().session_id().await.is_none() {
            debug!("no open session to close");
            return;
        }

        let options = RequestOptions::new()
            .json_with_session(|session| json!({ "sessionId": session.session_id }));
        let result = self.execute(Method::POST, CLOSE_SYSTEM, options).await;
        self.session().invalidate().await;

        match result {
            Ok(body) => debug!(response = %body, "closed system"),
            Err(e) => warn!(error = %e, "closing the portal session failed"),
        }
    }
}
