use super::{
    flow::ConfirmationFlow,
    request::QueryParams,
    result::{ConfirmationResult, ConfirmationState},
};

/// One page load of the confirmation callback.
///
/// Starts in `loading`, settles once. Running it again after it settled
/// returns the settled result without contacting the provider; a retry
/// consumes the page and starts over from `loading`.
#[derive(Debug)]
pub struct ConfirmationPage {
    params: QueryParams,
    result: ConfirmationResult,
    attempted: bool,
}

impl ConfirmationPage {
    #[must_use]
    pub fn new(params: QueryParams) -> Self {
        Self {
            params,
            result: ConfirmationResult::loading(),
            attempted: false,
        }
    }

    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    #[must_use]
    pub fn result(&self) -> &ConfirmationResult {
        &self.result
    }

    #[must_use]
    pub fn state(&self) -> ConfirmationState {
        self.result.state
    }

    /// Run the verification for this page load, once.
    pub async fn run(&mut self, flow: &ConfirmationFlow) -> &ConfirmationResult {
        if !self.attempted {
            self.attempted = true;
            self.result = flow.verify(&self.params).await;
        }

        &self.result
    }

    /// Discard the current outcome and start a fresh page load with the same
    /// query string.
    #[must_use]
    pub fn retry(self) -> Self {
        Self::new(self.params)
    }

    #[must_use]
    pub fn into_result(self) -> ConfirmationResult {
        self.result
    }
}
