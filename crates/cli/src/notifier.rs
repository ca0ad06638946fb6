// Console-backed dispatch notices
//
// Real delivery (chat message with a scannable code) belongs to an external
// collaborator; the console prints the confirmation payload so an operator
// can relay it by hand.

use async_trait::async_trait;
use colored::Colorize;
use lanekeeper_core::port::{CalledNotice, Notifier};
use tracing::info;

pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn ticket_called(&self, notice: CalledNotice) {
        // Same payload shape the scanner application expects
        let payload = format!("q:{}:{}", notice.ticket_id, notice.token);
        info!(
            ticket_id = notice.ticket_id,
            lane_id = notice.lane_id,
            address = %notice.address,
            "Dispatch notice emitted"
        );
        println!(
            "notice -> {}: ticket #{} called on lane {}, confirmation payload {}",
            notice.address.bold(),
            notice.ticket_id,
            notice.lane_id,
            payload.cyan()
        );
    }
}
