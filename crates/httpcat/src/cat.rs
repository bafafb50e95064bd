//! The httpcat decision logic: log the request, allow it unchanged.

use anyhow::Context;
use tracing::info;
use webhook::{DecisionRequest, HandlerFuture, PatchAccumulator, RequestContext, WebhookHandler};

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpCat;

impl WebhookHandler for HttpCat {
    fn handle<'a>(
        &'a self,
        _ctx: RequestContext,
        request: &'a DecisionRequest,
        _writer: &'a mut PatchAccumulator,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let pretty = serde_json::to_string_pretty(request)
                .context("failed to render admission request")?;
            info!(uid = %request.uid, "admission request received:\n{pretty}");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webhook::CancellationToken;

    #[tokio::test]
    async fn allows_without_patching() {
        let request: DecisionRequest =
            serde_json::from_str(r#"{"uid":"abc","operation":"CREATE"}"#).unwrap();
        let mut writer = PatchAccumulator::new();
        HttpCat
            .handle(
                RequestContext::new(CancellationToken::new()),
                &request,
                &mut writer,
            )
            .await
            .unwrap();

        let response = writer.build(request.uid.clone()).unwrap();
        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.status.is_none());
    }
}
