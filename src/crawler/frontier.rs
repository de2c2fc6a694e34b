//! Frontier queue of pending crawl requests
//!
//! The frontier is a FIFO bounded by the run's request budget: a request is
//! accepted only while `dispatched + queued` is below `max_requests`, so the
//! number of dispatched requests can never exceed the budget.
//!
//! Deduplication happens before the frontier, in `VisitedSet::try_claim`.

use crate::url::NormalizedUrl;
use std::collections::VecDeque;
use std::fmt;

/// How a request entered the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Seed,
    Link,
    /// A "next page" state of an already fetched URL. Pagination is walked
    /// on the open page, so the coordinator never enqueues this kind.
    Pagination,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Seed => "seed",
            Self::Link => "link",
            Self::Pagination => "pagination",
        };
        f.write_str(label)
    }
}

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: NormalizedUrl,
    pub kind: RequestKind,
    /// Link distance from the seed that led here
    pub depth: u32,
}

impl CrawlRequest {
    pub fn seed(url: NormalizedUrl) -> Self {
        Self {
            url,
            kind: RequestKind::Seed,
            depth: 0,
        }
    }

    pub fn link(url: NormalizedUrl, depth: u32) -> Self {
        Self {
            url,
            kind: RequestKind::Link,
            depth,
        }
    }
}

/// Result of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Accepted,
    /// The budget is already committed; the request was dropped
    BudgetExhausted,
}

/// Budget-bounded FIFO of crawl requests
#[derive(Debug)]
pub struct FrontierQueue {
    queue: VecDeque<CrawlRequest>,
    max_requests: usize,
    dispatched: usize,
    dropped_by_budget: usize,
}

impl FrontierQueue {
    /// Creates an empty frontier for a run with the given request budget
    pub fn new(max_requests: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_requests,
            dispatched: 0,
            dropped_by_budget: 0,
        }
    }

    /// Appends a request unless the budget is fully committed
    ///
    /// Dropping is silent apart from the dropped-by-budget counter.
    pub fn enqueue(&mut self, request: CrawlRequest) -> Enqueue {
        if self.committed() >= self.max_requests {
            self.dropped_by_budget += 1;
            tracing::debug!("Budget exhausted, dropping {}", request.url);
            return Enqueue::BudgetExhausted;
        }

        self.queue.push_back(request);
        Enqueue::Accepted
    }

    /// Pops the oldest request and counts it as dispatched
    ///
    /// Returns `None` when the frontier is empty.
    pub fn dequeue(&mut self) -> Option<CrawlRequest> {
        if self.budget_spent() {
            return None;
        }

        let request = self.queue.pop_front()?;
        self.dispatched += 1;
        Some(request)
    }

    /// Number of requests waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn dropped_by_budget(&self) -> usize {
        self.dropped_by_budget
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// True once `max_requests` requests have been dispatched
    pub fn budget_spent(&self) -> bool {
        self.dispatched >= self.max_requests
    }

    /// Budget not yet dispatched or queued
    pub fn remaining_budget(&self) -> usize {
        self.max_requests.saturating_sub(self.committed())
    }

    fn committed(&self) -> usize {
        self.dispatched + self.queue.len()
    }
}
