//! Confirmation-token protocol: expiry, single use, auth boundary

mod common;

use common::{profile, TestContext, OPERATOR};
use lanekeeper_core::config::DEFAULT_TOKEN_TTL_MS;
use lanekeeper_core::domain::TicketStatus;
use lanekeeper_core::error::AppError;

#[tokio::test]
async fn test_dispatch_notice_carries_the_issued_token() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();

    let notices = ctx.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].ticket_id, called.id);
    assert_eq!(notices[0].lane_id, 1);
    assert_eq!(notices[0].token, called.confirm_token.clone().unwrap());
    assert_eq!(notices[0].address, "chat-u1");
}

#[tokio::test]
async fn test_confirm_within_window_succeeds() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.unwrap();

    ctx.time.advance(DEFAULT_TOKEN_TTL_MS - 1);
    let confirmed = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap();
    assert_eq!(confirmed.status, TicketStatus::Confirmed);
}

#[tokio::test]
async fn test_confirm_at_exact_expiry_instant_still_succeeds() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.unwrap();

    ctx.time.set(called.token_expires_at.unwrap());
    let confirmed = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap();
    assert_eq!(confirmed.status, TicketStatus::Confirmed);
}

#[tokio::test]
async fn test_confirm_past_expiry_is_rejected() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.unwrap();

    ctx.time.set(called.token_expires_at.unwrap() + 1);
    let err = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpiredToken));

    // Lazy expiry: the ticket itself stays CALLED until an operator acts
    assert_eq!(
        ctx.active_status_of("u1").await,
        Some(TicketStatus::Called)
    );
}

#[tokio::test]
async fn test_token_is_single_use() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.unwrap();

    ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap();

    let err = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let ctx = TestContext::new().await;

    let err = ctx
        .service
        .confirm_by_token("no-such-token", OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_non_operator_cannot_confirm() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.unwrap();

    let err = ctx
        .service
        .confirm_by_token(&token, "someone-else")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    // The rejected attempt must not consume the token
    let confirmed = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap();
    assert_eq!(confirmed.status, TicketStatus::Confirmed);
}

#[tokio::test]
async fn test_canceled_ticket_token_is_moot() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.unwrap();

    assert!(ctx.service.leave("u1").await.unwrap());

    let err = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_each_call_issues_a_distinct_token() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    ctx.time.advance(1_000);
    ctx.service.enqueue(1, &profile("u2")).await.unwrap();

    let first = ctx.service.call_next(1).await.unwrap().unwrap();
    let second = ctx.service.call_next(1).await.unwrap().unwrap();

    assert_ne!(first.confirm_token, second.confirm_token);
}
