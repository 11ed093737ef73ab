//! Drop-in replacements for axum's `Json`, `Path` and `Query` whose
//! rejections render through [`AppError`], so malformed input gets the same
//! error envelope as every other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);
