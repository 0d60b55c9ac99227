// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection liveness tracking.
//!
//! The server pings every `ping_period` and expects some pong within
//! `pong_wait` of the last one. The deadline starts at connection open and
//! moves forward on every pong; once it passes the connection is dead.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub ping_period: Duration,
    pub pong_wait: Duration,
    pub write_wait: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from_pong_wait(Duration::from_secs(60), Duration::from_secs(5))
    }
}

impl HeartbeatConfig {
    /// Derive the ping period as 9/10 of the pong window.
    pub fn from_pong_wait(pong_wait: Duration, write_wait: Duration) -> Self {
        Self {
            ping_period: pong_wait * 9 / 10,
            pong_wait,
            write_wait,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No ping outstanding.
    Alive,
    /// A ping was written and no pong has arrived since.
    AwaitingPong,
    /// Terminal.
    Closed,
}

#[derive(Debug)]
pub struct Heartbeat {
    liveness: Liveness,
    deadline: Instant,
    pong_wait: Duration,
}

impl Heartbeat {
    pub fn new(config: &HeartbeatConfig, now: Instant) -> Self {
        Self {
            liveness: Liveness::Alive,
            deadline: now + config.pong_wait,
            pong_wait: config.pong_wait,
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    /// Instant after which the connection counts as dead.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn ping_sent(&mut self) {
        if self.liveness == Liveness::Alive {
            self.liveness = Liveness::AwaitingPong;
        }
    }

    pub fn pong_received(&mut self, now: Instant) {
        if self.liveness != Liveness::Closed {
            self.liveness = Liveness::Alive;
            self.deadline = now + self.pong_wait;
        }
    }

    /// A ping or data write did not complete within the write window.
    pub fn write_timed_out(&mut self) {
        self.liveness = Liveness::Closed;
    }

    /// Close the connection if the pong deadline has passed.
    pub fn check(&mut self, now: Instant) -> Liveness {
        if self.liveness != Liveness::Closed && now >= self.deadline {
            self.liveness = Liveness::Closed;
        }
        self.liveness
    }
}
