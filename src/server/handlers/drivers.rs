use axum::extract::{Extension, Json};
use axum::http::HeaderMap;

use crate::api::DynAPI;
use crate::entities::Driver;
use crate::error::Error;
use crate::server::handlers::authenticate;

pub async fn profile(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
) -> Result<Json<Driver>, Error> {
    let user = authenticate(&api, &headers).await?;
    let driver = api.driver_profile(user).await?;

    Ok(driver.into())
}
