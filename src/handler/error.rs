//! Request-terminal errors and their HTTP mapping

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use thiserror::Error;

use crate::http;
use crate::upstream::UpstreamError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Error fetching quote: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
    #[error("Price not available")]
    PriceUnavailable,
    #[error("Not Found")]
    InvalidRoute,
}

impl GatewayError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::UpstreamUnavailable(_) => 500,
            Self::PriceUnavailable | Self::InvalidRoute => 404,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        match self {
            Self::InvalidRoute => http::build_404_response(),
            other => http::build_text_response(other.status(), other.to_string()),
        }
    }
}
