//! End-to-end ticket lifecycle against the real SQLite store

mod common;

use common::{profile, TestContext, OPERATOR};
use lanekeeper_core::domain::TicketStatus;
use lanekeeper_core::error::AppError;
use lanekeeper_core::port::TicketRepository;

#[tokio::test]
async fn test_join_empty_lane_gets_position_one() {
    let ctx = TestContext::new().await;

    let ticket = ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Waiting);

    let info = ctx.service.position("u1").await.unwrap().unwrap();
    assert_eq!(info.ticket.id, ticket.id);
    assert_eq!(info.position, Some(1));
}

#[tokio::test]
async fn test_call_next_advances_the_oldest_ticket() {
    let ctx = TestContext::new().await;

    let first = ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    ctx.time.advance(1_000);
    let second = ctx.service.enqueue(1, &profile("u2")).await.unwrap();

    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    assert_eq!(called.id, first.id);
    assert_eq!(called.status, TicketStatus::Called);
    assert!(called.confirm_token.is_some());
    assert!(called.called_at.is_some());

    // The remaining ticket moves up to the head of the line
    let info = ctx.service.position("u2").await.unwrap().unwrap();
    assert_eq!(info.ticket.id, second.id);
    assert_eq!(info.position, Some(1));
}

#[tokio::test]
async fn test_full_happy_path_to_served() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();
    let token = called.confirm_token.clone().unwrap();

    ctx.time.advance(60_000);
    let confirmed = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap();
    assert_eq!(confirmed.id, called.id);
    assert_eq!(confirmed.status, TicketStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());

    ctx.time.advance(60_000);
    let served = ctx.service.serve_confirmed(1).await.unwrap().unwrap();
    assert_eq!(served.id, called.id);
    assert_eq!(served.status, TicketStatus::Served);
    assert!(served.served_at.is_some());

    // Terminal: the user no longer has an active ticket
    assert!(ctx.active_status_of("u1").await.is_none());
}

#[tokio::test]
async fn test_operator_actions_on_empty_lane_do_nothing() {
    let ctx = TestContext::new().await;

    assert!(ctx.service.call_next(1).await.unwrap().is_none());
    assert!(ctx.service.mark_no_show(1).await.unwrap().is_none());
    assert!(ctx.service.serve_confirmed(1).await.unwrap().is_none());
    assert!(ctx.service.list_waiting(1, 30).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enqueue_is_idempotent_while_active() {
    let ctx = TestContext::new().await;

    let first = ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    ctx.time.advance(1_000);
    let again = ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.created_at, first.created_at);

    // Even towards another lane the existing ticket wins
    let other_lane = ctx.service.enqueue(2, &profile("u1")).await.unwrap();
    assert_eq!(other_lane.id, first.id);
    assert_eq!(other_lane.lane_id, 1);

    assert_eq!(ctx.service.list_waiting(1, 30).await.unwrap().len(), 1);
    assert!(ctx.service.list_waiting(2, 30).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_leave_then_rejoin_creates_a_fresh_ticket() {
    let ctx = TestContext::new().await;

    let first = ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    assert!(ctx.service.leave("u1").await.unwrap());

    // Nothing left to cancel
    assert!(!ctx.service.leave("u1").await.unwrap());
    assert!(ctx.service.position("u1").await.unwrap().is_none());

    ctx.time.advance(1_000);
    let second = ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.status, TicketStatus::Waiting);
}

#[tokio::test]
async fn test_leave_cancels_a_called_ticket() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    let called = ctx.service.call_next(1).await.unwrap().unwrap();

    assert!(ctx.service.leave("u1").await.unwrap());
    let ticket = ctx.repo.find_ticket(called.id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Canceled);
    assert!(ticket.canceled_at.is_some());

    // The lane has nothing called anymore
    assert!(ctx.service.mark_no_show(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_no_show_resolves_the_longest_called() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    ctx.time.advance(1_000);
    ctx.service.enqueue(1, &profile("u2")).await.unwrap();

    let first_called = ctx.service.call_next(1).await.unwrap().unwrap();
    ctx.time.advance(1_000);
    ctx.service.call_next(1).await.unwrap().unwrap();

    let absent = ctx.service.mark_no_show(1).await.unwrap().unwrap();
    assert_eq!(absent.id, first_called.id);
    assert_eq!(absent.status, TicketStatus::NoShow);

    // Its token is moot now
    let token = first_called.confirm_token.unwrap();
    let err = ctx.service.confirm_by_token(&token, OPERATOR).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_enqueue_unknown_lane_is_not_found() {
    let ctx = TestContext::new().await;

    let err = ctx.service.enqueue(99, &profile("u1")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(ctx.service.position("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_position_is_not_a_rank_once_called() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    ctx.service.call_next(1).await.unwrap().unwrap();

    let info = ctx.service.position("u1").await.unwrap().unwrap();
    assert_eq!(info.ticket.status, TicketStatus::Called);
    assert_eq!(info.position, None);
}

#[tokio::test]
async fn test_lanes_are_independent_fifo_lines() {
    let ctx = TestContext::new().await;

    ctx.service.enqueue(1, &profile("u1")).await.unwrap();
    ctx.time.advance(1_000);
    ctx.service.enqueue(2, &profile("u2")).await.unwrap();
    ctx.time.advance(1_000);
    ctx.service.enqueue(1, &profile("u3")).await.unwrap();

    // Lane 2's only ticket is its head regardless of lane 1 traffic
    let called = ctx.service.call_next(2).await.unwrap().unwrap();
    assert_eq!(called.lane_id, 2);

    let info = ctx.service.position("u3").await.unwrap().unwrap();
    assert_eq!(info.position, Some(2));
}
