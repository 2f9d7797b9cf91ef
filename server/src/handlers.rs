use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use platform_api::ApiResult;
use platform_authn::TokenPair;
use products_hr::{
    AccessToken, CSV_CONTENT_TYPE, DepartmentChanges, DepartmentView, EmployeeChanges,
    EmployeeRecord, EmployeeView, ExportKind, ListParams, NewDepartment, NewEmployee, NewProject,
    ProjectChanges, ProjectView, Report, ReportKind,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    extract::{ApiJson, ApiPath, ApiQuery, CurrentIdentity},
    http::AppState,
};

#[derive(Deserialize)]
pub struct TokenRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh: String,
}

#[derive(Deserialize)]
pub struct KindQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pair = state
        .hr
        .sessions(&state.config.tokens)
        .obtain_pair(&body.username, &body.password)
        .await?;
    Ok(Json(pair))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AccessToken>> {
    let access = state
        .hr
        .sessions(&state.config.tokens)
        .refresh(&body.refresh)
        .await?;
    Ok(Json(access))
}

pub async fn list_departments(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Vec<DepartmentView>>> {
    Ok(Json(state.hr.departments().list(&who, &params).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiJson(input): ApiJson<NewDepartment>,
) -> ApiResult<(StatusCode, Json<DepartmentView>)> {
    let created = state.hr.departments().create(&who, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_department(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DepartmentView>> {
    Ok(Json(state.hr.departments().retrieve(&who, id).await?))
}

pub async fn update_department(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<DepartmentChanges>,
) -> ApiResult<Json<DepartmentView>> {
    Ok(Json(state.hr.departments().update(&who, id, changes).await?))
}

pub async fn delete_department(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.hr.departments().delete(&who, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_employees(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Vec<EmployeeView>>> {
    Ok(Json(state.hr.employees().list(&who, &params).await?))
}

pub async fn create_employee(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiJson(input): ApiJson<NewEmployee>,
) -> ApiResult<(StatusCode, Json<EmployeeRecord>)> {
    let created = state.hr.employees().create(&who, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_employee(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<EmployeeView>> {
    Ok(Json(state.hr.employees().retrieve(&who, id).await?))
}

pub async fn update_employee(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<EmployeeChanges>,
) -> ApiResult<Json<EmployeeRecord>> {
    Ok(Json(state.hr.employees().update(&who, id, changes).await?))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.hr.employees().delete(&who, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_projects(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    Ok(Json(state.hr.projects().list(&who, &params).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiJson(input): ApiJson<NewProject>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let created = state.hr.projects().create(&who, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_project(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectView>> {
    Ok(Json(state.hr.projects().retrieve(&who, id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<ProjectChanges>,
) -> ApiResult<Json<ProjectView>> {
    Ok(Json(state.hr.projects().update(&who, id, changes).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.hr.projects().delete(&who, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reports(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiQuery(query): ApiQuery<KindQuery>,
) -> ApiResult<Json<Report>> {
    let kind = ReportKind::parse(query.kind.as_deref())?;
    Ok(Json(state.hr.reports().run(&who, kind).await?))
}

pub async fn export(
    State(state): State<AppState>,
    CurrentIdentity(who): CurrentIdentity,
    ApiQuery(query): ApiQuery<KindQuery>,
) -> ApiResult<Response> {
    let kind = ExportKind::parse(query.kind.as_deref())?;
    let file = state.hr.exports().run(&who, kind).await?;
    let disposition = file.content_disposition();
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}
