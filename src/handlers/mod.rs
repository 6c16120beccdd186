// handlers/mod.rs - HTTP handlers
//
// public:    no identity required (login, user listing and registration)
// protected: every handler starts with a gate decision on the caller
//
// Extractor rejections are taken as `Result`s so that a gate can answer
// 401/403 before a malformed body or query gets a chance to answer 400.

pub mod protected;
pub mod public;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::error::ApiError;

pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::invalid_json(e.body_text()))
}

pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub(crate) fn path<T>(segment: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    segment
        .map(|Path(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}
