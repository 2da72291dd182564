//! Resolution of a single entity against the external site.
//!
//! Each entity walks a small state machine:
//!
//! ```text
//! ProbeNext -> Fetch -> Score -> Accept
//!     ^          |        |
//!     |          |        +-> FollowLink (listing) -> Fetch
//!     +----------+--------+-> NextCandidate
//! ProbeNext with an empty queue -> Exhausted
//! ```
//!
//! Probing is strictly sequential. The first accepted page in probe order
//! wins, so ties resolve to the earlier (higher-priority) candidate.

use std::collections::{HashSet, VecDeque};

use vinedb_scraper::matcher::ParsedPage;
use vinedb_scraper::{
    extract_candidate, score_links, FetchError, MatchCandidate, MatchConfig, MatchTarget,
    PageFetcher, ProbeKind, ProbePlan, ProbeUrl, Rejection,
};

/// What happened to one probed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    NotFound,
    FetchFailed(String),
    NoMatch { score: i32, threshold: i32 },
    Empty,
    /// A listing page with no link worth following.
    NoLink,
    /// A listing page whose best link was queued.
    Followed(String),
    Accepted,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptOutcome::NotFound => f.write_str("not found"),
            AttemptOutcome::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            AttemptOutcome::NoMatch { score, threshold } => {
                write!(f, "no match (score {score} < {threshold})")
            }
            AttemptOutcome::Empty => f.write_str("matched but nothing extractable"),
            AttemptOutcome::NoLink => f.write_str("no qualifying link on listing"),
            AttemptOutcome::Followed(url) => write!(f, "followed {url}"),
            AttemptOutcome::Accepted => f.write_str("accepted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeAttempt {
    pub url: String,
    pub kind: ProbeKind,
    pub outcome: AttemptOutcome,
}

/// Result of resolving one entity.
#[derive(Debug, Clone)]
pub(crate) struct Resolution {
    pub candidate: Option<MatchCandidate>,
    pub attempts: Vec<ProbeAttempt>,
}

impl Resolution {
    /// Human-readable reason for a resolution that found nothing.
    pub(crate) fn failure_reason(&self) -> String {
        if self.attempts.is_empty() {
            return "no candidate URLs to probe".to_string();
        }
        let fetched = self
            .attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::NotFound))
            .count();
        let last = self
            .attempts
            .iter()
            .rev()
            .find(|a| !matches!(a.outcome, AttemptOutcome::NotFound))
            .or_else(|| self.attempts.last())
            .map(|a| format!("{} {}: {}", a.kind, a.url, a.outcome))
            .unwrap_or_default();
        format!(
            "no candidate matched after {} probes ({fetched} fetched); last: {last}",
            self.attempts.len()
        )
    }
}

/// Decision for one fetched page. Pure; no network access.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScoreStep {
    Accept(MatchCandidate),
    /// Listing page: fetch this link next and apply the direct-page rule.
    FollowLink(String),
    NextCandidate(AttemptOutcome),
}

/// Scores a fetched page according to the kind of probe that produced it.
///
/// Listings only ever yield a link to follow; their own headings and images
/// belong to other products. A search that redirected to a product page is
/// scored by the caller as a direct page.
pub(crate) fn score_step(
    kind: ProbeKind,
    page: &ParsedPage,
    target: &MatchTarget,
    config: &MatchConfig,
    visited: &HashSet<String>,
) -> ScoreStep {
    if kind.is_listing() {
        let best = score_links(page, target, config)
            .into_iter()
            .find(|link| !visited.contains(&link.url));
        return match best {
            Some(link) => ScoreStep::FollowLink(link.url),
            None => ScoreStep::NextCandidate(AttemptOutcome::NoLink),
        };
    }

    match extract_candidate(page, target, config) {
        Ok(candidate) => ScoreStep::Accept(candidate),
        Err(Rejection::NoMatch(score)) => ScoreStep::NextCandidate(AttemptOutcome::NoMatch {
            score: score.score,
            threshold: score.threshold,
        }),
        Err(Rejection::Empty(_)) => ScoreStep::NextCandidate(AttemptOutcome::Empty),
    }
}

enum State {
    ProbeNext,
    Fetch(ProbeUrl),
    Score {
        probe: ProbeUrl,
        kind: ProbeKind,
        page: ParsedPage,
    },
    Accept(MatchCandidate),
    Exhausted,
}

/// Probes the plan in order until a page is accepted or the plan runs out.
///
/// A known URL, when present, goes first; if it is accepted the generated
/// candidates are never fetched.
pub(crate) async fn resolve_entity(
    fetcher: &PageFetcher,
    plan: ProbePlan,
    target: &MatchTarget,
    config: &MatchConfig,
) -> Resolution {
    let mut queue: VecDeque<ProbeUrl> = plan.known.into_iter().chain(plan.candidates).collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut attempts: Vec<ProbeAttempt> = Vec::new();
    let mut state = State::ProbeNext;

    loop {
        state = match state {
            State::ProbeNext => match queue.pop_front() {
                Some(probe) if visited.insert(probe.url.clone()) => State::Fetch(probe),
                Some(_) => State::ProbeNext,
                None => State::Exhausted,
            },

            State::Fetch(probe) => {
                let fetched = fetcher.fetch(&probe.url).await;
                match fetched {
                    Ok(fetched) => {
                        // Redirects can land on a page already scored.
                        if fetched.url != probe.url && !visited.insert(fetched.url.clone()) {
                            tracing::debug!(
                                url = %probe.url,
                                landed = %fetched.url,
                                "redirected to a visited page"
                            );
                            State::ProbeNext
                        } else {
                            // A listing that redirected landed on a single product.
                            let kind = if fetched.url == probe.url {
                                probe.kind
                            } else {
                                ProbeKind::DirectPage
                            };
                            let page = ParsedPage::parse(&fetched.body, &fetched.url);
                            State::Score { probe, kind, page }
                        }
                    }
                    Err(e) => {
                        let outcome = match &e {
                            FetchError::NotFound { .. } => AttemptOutcome::NotFound,
                            other => AttemptOutcome::FetchFailed(other.to_string()),
                        };
                        if matches!(outcome, AttemptOutcome::NotFound) {
                            tracing::debug!(
                                url = %probe.url,
                                kind = %probe.kind,
                                "candidate not found"
                            );
                        } else {
                            tracing::warn!(
                                url = %probe.url,
                                kind = %probe.kind,
                                error = %e,
                                "candidate fetch failed"
                            );
                        }
                        attempts.push(ProbeAttempt {
                            url: probe.url,
                            kind: probe.kind,
                            outcome,
                        });
                        State::ProbeNext
                    }
                }
            }

            State::Score { probe, kind, page } => {
                match score_step(kind, &page, target, config, &visited) {
                    ScoreStep::Accept(candidate) => {
                        tracing::debug!(
                            url = %page.url,
                            score = candidate.score,
                            "page accepted"
                        );
                        attempts.push(ProbeAttempt {
                            url: probe.url,
                            kind: probe.kind,
                            outcome: AttemptOutcome::Accepted,
                        });
                        State::Accept(candidate)
                    }
                    ScoreStep::FollowLink(url) => {
                        tracing::debug!(
                            listing = %probe.url,
                            link = %url,
                            "following best listing link"
                        );
                        attempts.push(ProbeAttempt {
                            url: probe.url,
                            kind: probe.kind,
                            outcome: AttemptOutcome::Followed(url.clone()),
                        });
                        queue.push_front(ProbeUrl {
                            url,
                            kind: ProbeKind::DirectPage,
                        });
                        State::ProbeNext
                    }
                    ScoreStep::NextCandidate(outcome) => {
                        tracing::debug!(
                            url = %probe.url,
                            outcome = %outcome,
                            "candidate rejected"
                        );
                        attempts.push(ProbeAttempt {
                            url: probe.url,
                            kind: probe.kind,
                            outcome,
                        });
                        State::ProbeNext
                    }
                }
            }

            State::Accept(candidate) => {
                return Resolution {
                    candidate: Some(candidate),
                    attempts,
                }
            }

            State::Exhausted => {
                return Resolution {
                    candidate: None,
                    attempts,
                }
            }
        };
    }
}
