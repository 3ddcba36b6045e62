//! Email confirmation flow: query string in, one of four page states out.

mod flow;
mod page;
mod request;
mod result;

pub use self::flow::ConfirmationFlow;
pub use self::page::ConfirmationPage;
pub use self::request::{
    ConfirmationRequest, ConfirmationType, PARAM_TOKEN, PARAM_TYPE, QueryParams, RequestError,
    UnsupportedType,
};
pub use self::result::{
    ConfirmationResult, ConfirmationState, MSG_EXPIRED, MSG_FAILED, MSG_MISSING_TOKEN,
    MSG_NO_USER, MSG_SUCCESS, MSG_UNEXPECTED,
};
