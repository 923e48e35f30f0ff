//! Boundary to the external sector advisor.
//!
//! The advisor looks at the current planning scene and proposes angular
//! sectors worth exploring next. It may be a heuristic, a remote model, or a
//! stub. Whatever it returns is validated here before the planner sees it.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use super::error::FeedbackError;
use super::geometry::{bearing_deg, normalize_angle_deg, Bounds, CircleObstacle, Point};
use super::sampler::Sector;
use super::tree::RrtNode;

/// Opening of the fallback sector used when the advisor fails
pub const DEFAULT_SECTOR_SPAN_DEG: f64 = 45.0;

/// Angular clearance added beside an obstacle's tangent lines
const DEFLECTION_MARGIN_DEG: f64 = 10.0;

/// Scene handed to the advisor after each successful extension
#[derive(Debug, Clone, Copy)]
pub struct FeedbackContext<'a> {
    /// Index of the newly appended node
    pub origin_index: usize,
    /// The newly appended node
    pub origin: &'a RrtNode,
    pub goal: Point,
    /// All tree nodes at the time of the call
    pub nodes: &'a [RrtNode],
    pub obstacles: &'a [CircleObstacle],
    pub bounds: &'a Bounds,
}

/// Unvalidated sector as proposed by an advisor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorProposal {
    pub center_angle: f64,
    pub span_angle: f64,
    pub priority: f64,
}

impl SectorProposal {
    pub fn new(center_angle: f64, span_angle: f64, priority: f64) -> Self {
        Self {
            center_angle,
            span_angle,
            priority,
        }
    }
}

/// Full advisory payload, as a text-producing advisor is asked to emit it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    pub sectors: Vec<SectorProposal>,
    #[serde(default)]
    pub suggested_step_size: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Source of sector proposals
pub trait SectorAdvisor {
    fn propose(&mut self, ctx: &FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError>;
}

impl<A: SectorAdvisor + ?Sized> SectorAdvisor for Box<A> {
    fn propose(&mut self, ctx: &FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError> {
        (**self).propose(ctx)
    }
}

/// Convert proposals into planner sectors.
///
/// Centers are wrapped into `[0, 360)` and priorities clamped to `[0, 1]`.
/// A single non-finite value or non-positive span rejects the whole batch.
pub fn validate_proposals(proposals: &[SectorProposal]) -> Result<Vec<Sector>, FeedbackError> {
    proposals
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if !p.center_angle.is_finite() || !p.span_angle.is_finite() || !p.priority.is_finite() {
                return Err(FeedbackError::Malformed(format!(
                    "sector {i} has a non-finite field"
                )));
            }
            if p.span_angle <= 0.0 {
                return Err(FeedbackError::Malformed(format!(
                    "sector {i} has non-positive span {}",
                    p.span_angle
                )));
            }
            Ok(Sector::new(
                normalize_angle_deg(p.center_angle),
                p.span_angle,
                p.priority.clamp(0.0, 1.0),
            ))
        })
        .collect()
}

/// Sector pointing straight from `origin` at `goal`
pub fn default_sector(origin: &Point, goal: &Point) -> Sector {
    Sector::new(
        normalize_angle_deg(bearing_deg(origin, goal)),
        DEFAULT_SECTOR_SPAN_DEG,
        1.0,
    )
}

/// Pull the JSON object out of free-form advisor text and decode it.
///
/// Surrounding prose and Markdown code fences are ignored; everything from
/// the first `{` to the last `}` must be a valid [`AdvisoryResponse`].
/// Nothing in the text is ever evaluated.
pub fn parse_advisory_payload(text: &str) -> Result<AdvisoryResponse, FeedbackError> {
    let start = text
        .find('{')
        .ok_or_else(|| FeedbackError::Malformed("no JSON object in payload".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| FeedbackError::Malformed("unterminated JSON object".to_string()))?;
    let response: AdvisoryResponse = serde_json::from_str(&text[start..=end])?;
    Ok(response)
}

/// Advisor that never proposes anything; the planner samples uniformly
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdvice;

impl SectorAdvisor for NoAdvice {
    fn propose(
        &mut self,
        _ctx: &FeedbackContext<'_>,
    ) -> Result<Vec<SectorProposal>, FeedbackError> {
        Ok(Vec::new())
    }
}

/// Wraps a closure as an advisor
pub struct FnAdvisor<F> {
    f: F,
}

/// Build an advisor from a closure
pub fn from_fn<F>(f: F) -> FnAdvisor<F>
where
    F: FnMut(&FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError>,
{
    FnAdvisor { f }
}

impl<F> SectorAdvisor for FnAdvisor<F>
where
    F: FnMut(&FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError>,
{
    fn propose(&mut self, ctx: &FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError> {
        (self.f)(ctx)
    }
}

/// Adapts a collaborator that answers in text (e.g. a language model
/// endpoint) into an advisor by parsing its reply with
/// [`parse_advisory_payload`].
pub struct PayloadAdvisor<F> {
    fetch: F,
    last_response: Option<AdvisoryResponse>,
}

impl<F> PayloadAdvisor<F>
where
    F: FnMut(&FeedbackContext<'_>) -> Result<String, FeedbackError>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            last_response: None,
        }
    }

    /// Most recent successfully parsed payload, including the advisory
    /// step size and confidence the planner itself ignores
    pub fn last_response(&self) -> Option<&AdvisoryResponse> {
        self.last_response.as_ref()
    }
}

impl<F> SectorAdvisor for PayloadAdvisor<F>
where
    F: FnMut(&FeedbackContext<'_>) -> Result<String, FeedbackError>,
{
    fn propose(&mut self, ctx: &FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError> {
        let text = (self.fetch)(ctx)?;
        let response = parse_advisory_payload(&text)?;
        let sectors = response.sectors.clone();
        self.last_response = Some(response);
        Ok(sectors)
    }
}

/// Straight-line heuristic.
///
/// With a clear line of sight it proposes a single wedge toward the goal.
/// When an obstacle blocks the line it proposes two wedges skirting that
/// obstacle's tangents, favoring the side closer to the goal bearing, plus a
/// low-priority wedge toward the goal.
#[derive(Debug, Clone, Copy)]
pub struct GoalBearingAdvisor {
    pub span_angle: f64,
}

impl Default for GoalBearingAdvisor {
    fn default() -> Self {
        Self {
            span_angle: DEFAULT_SECTOR_SPAN_DEG,
        }
    }
}

impl GoalBearingAdvisor {
    pub fn new(span_angle: f64) -> Self {
        Self { span_angle }
    }

    /// First obstacle (closest along the line) blocking `from -> to`
    fn first_blocker<'a>(
        from: &Point,
        to: &Point,
        obstacles: &'a [CircleObstacle],
    ) -> Option<&'a CircleObstacle> {
        let dir = to - from;
        let len_sq = dir.norm_squared();
        if len_sq <= f64::EPSILON {
            return None;
        }
        obstacles
            .iter()
            .filter_map(|obs| {
                let t = ((obs.center() - from).dot(&dir) / len_sq).clamp(0.0, 1.0);
                let closest = from + dir * t;
                (nalgebra::distance(&closest, &obs.center()) <= obs.radius).then_some((t, obs))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, obs)| obs)
    }
}

impl SectorAdvisor for GoalBearingAdvisor {
    fn propose(&mut self, ctx: &FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError> {
        let origin = ctx.origin.position();
        let goal_bearing = bearing_deg(&origin, &ctx.goal);

        let Some(obs) = Self::first_blocker(&origin, &ctx.goal, ctx.obstacles) else {
            return Ok(vec![SectorProposal::new(goal_bearing, self.span_angle, 1.0)]);
        };

        let to_center = bearing_deg(&origin, &obs.center());
        let dist = nalgebra::distance(&origin, &obs.center());
        let half_width = if dist > obs.radius {
            (obs.radius / dist).asin().to_degrees()
        } else {
            90.0
        };
        let left = to_center + half_width + DEFLECTION_MARGIN_DEG;
        let right = to_center - half_width - DEFLECTION_MARGIN_DEG;

        let deviation = |a: f64| {
            let d = normalize_angle_deg(a - goal_bearing);
            d.min(360.0 - d)
        };
        let (left_priority, right_priority) = if deviation(left) <= deviation(right) {
            (0.7, 0.5)
        } else {
            (0.5, 0.7)
        };

        Ok(vec![
            SectorProposal::new(left, self.span_angle, left_priority),
            SectorProposal::new(right, self.span_angle, right_priority),
            SectorProposal::new(goal_bearing, self.span_angle, 0.2),
        ])
    }
}

/// Owned copy of a [`FeedbackContext`] that can cross to a worker thread
struct OwnedContext {
    origin_index: usize,
    goal: Point,
    nodes: Vec<RrtNode>,
    obstacles: Vec<CircleObstacle>,
    bounds: Bounds,
}

impl OwnedContext {
    fn from_context(ctx: &FeedbackContext<'_>) -> Self {
        Self {
            origin_index: ctx.origin_index,
            goal: ctx.goal,
            nodes: ctx.nodes.to_vec(),
            obstacles: ctx.obstacles.to_vec(),
            bounds: *ctx.bounds,
        }
    }

    fn as_context(&self) -> Option<FeedbackContext<'_>> {
        Some(FeedbackContext {
            origin_index: self.origin_index,
            origin: self.nodes.get(self.origin_index)?,
            goal: self.goal,
            nodes: &self.nodes,
            obstacles: &self.obstacles,
            bounds: &self.bounds,
        })
    }
}

type Reply = (u64, Result<Vec<SectorProposal>, FeedbackError>);

/// Runs an advisor on a worker thread and bounds each call by a timeout.
///
/// A reply that arrives after its deadline is dropped when the next call
/// drains the channel. A worker still busy with a timed-out request delays
/// the following request, which then also counts against its own deadline.
pub struct TimeoutAdvisor {
    request_tx: Sender<(u64, OwnedContext)>,
    reply_rx: Receiver<Reply>,
    timeout: Duration,
    seq: u64,
}

impl TimeoutAdvisor {
    pub fn new<A>(mut advisor: A, timeout: Duration) -> Self
    where
        A: SectorAdvisor + Send + 'static,
    {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<(u64, OwnedContext)>();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<Reply>();

        std::thread::spawn(move || {
            for (seq, owned) in request_rx {
                let result = match owned.as_context() {
                    Some(ctx) => advisor.propose(&ctx),
                    None => Err(FeedbackError::Unavailable(format!(
                        "origin index {} outside snapshot",
                        owned.origin_index
                    ))),
                };
                if reply_tx.send((seq, result)).is_err() {
                    break;
                }
            }
        });

        Self {
            request_tx,
            reply_rx,
            timeout,
            seq: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl SectorAdvisor for TimeoutAdvisor {
    fn propose(&mut self, ctx: &FeedbackContext<'_>) -> Result<Vec<SectorProposal>, FeedbackError> {
        self.seq += 1;
        let seq = self.seq;
        let deadline = Instant::now() + self.timeout;

        self.request_tx
            .send((seq, OwnedContext::from_context(ctx)))
            .map_err(|_| FeedbackError::Unavailable("advisor worker stopped".to_string()))?;

        loop {
            match self.reply_rx.recv_deadline(deadline) {
                Ok((reply_seq, result)) if reply_seq == seq => return result,
                // Late reply to an earlier timed-out request
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(FeedbackError::Timeout(self.timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FeedbackError::Unavailable(
                        "advisor worker stopped".to_string(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Scene {
        nodes: Vec<RrtNode>,
        obstacles: Vec<CircleObstacle>,
        bounds: Bounds,
        goal: Point,
    }

    impl Scene {
        fn new(obstacles: Vec<CircleObstacle>) -> Self {
            Self {
                nodes: vec![RrtNode::new(0.0, 0.0), RrtNode::with_parent(1.0, 1.0, 0)],
                obstacles,
                bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
                goal: Point::new(9.0, 1.0),
            }
        }

        fn context(&self) -> FeedbackContext<'_> {
            FeedbackContext {
                origin_index: 1,
                origin: &self.nodes[1],
                goal: self.goal,
                nodes: &self.nodes,
                obstacles: &self.obstacles,
                bounds: &self.bounds,
            }
        }
    }

    #[test]
    fn test_validate_normalizes_and_clamps() {
        let sectors = validate_proposals(&[
            SectorProposal::new(-45.0, 30.0, 1.7),
            SectorProposal::new(400.0, 10.0, -0.3),
        ])
        .unwrap();
        assert_relative_eq!(sectors[0].center_angle, 315.0);
        assert_relative_eq!(sectors[0].priority, 1.0);
        assert_relative_eq!(sectors[1].center_angle, 40.0, epsilon = 1e-9);
        assert_relative_eq!(sectors[1].priority, 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_batches() {
        assert!(matches!(
            validate_proposals(&[
                SectorProposal::new(0.0, 30.0, 0.5),
                SectorProposal::new(0.0, 0.0, 0.5),
            ]),
            Err(FeedbackError::Malformed(_))
        ));
        assert!(matches!(
            validate_proposals(&[SectorProposal::new(f64::NAN, 30.0, 0.5)]),
            Err(FeedbackError::Malformed(_))
        ));
        assert_eq!(validate_proposals(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn test_default_sector_points_at_goal() {
        let s = default_sector(&Point::new(0.0, 0.0), &Point::new(0.0, -3.0));
        assert_relative_eq!(s.center_angle, 270.0);
        assert_relative_eq!(s.span_angle, DEFAULT_SECTOR_SPAN_DEG);
        assert_relative_eq!(s.priority, 1.0);
    }

    #[test]
    fn test_parse_plain_payload() {
        let text = r#"{"sectors":[{"center_angle":45.0,"span_angle":30.0,"priority":0.8}],
                      "suggested_step_size":0.4,"confidence":0.9}"#;
        let response = parse_advisory_payload(text).unwrap();
        assert_eq!(response.sectors.len(), 1);
        assert_eq!(response.suggested_step_size, Some(0.4));
        assert_eq!(response.confidence, Some(0.9));
    }

    #[test]
    fn test_parse_fenced_payload_with_prose() {
        let text = "Here is my advice:\n```json\n{\"sectors\": [\
                    {\"center_angle\": 10, \"span_angle\": 20, \"priority\": 1},\
                    {\"center_angle\": 200, \"span_angle\": 40, \"priority\": 0.3}]}\n```\nGood luck!";
        let response = parse_advisory_payload(text).unwrap();
        assert_eq!(response.sectors[1].center_angle, 200.0);
        assert_eq!(response.confidence, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_advisory_payload("go north-east"),
            Err(FeedbackError::Malformed(_))
        ));
        assert!(matches!(
            parse_advisory_payload("} oops {"),
            Err(FeedbackError::Malformed(_))
        ));
        assert!(matches!(
            parse_advisory_payload(r#"{"sectors": "__import__('os')"}"#),
            Err(FeedbackError::Malformed(_))
        ));
        // Comment lines are not JSON
        assert!(parse_advisory_payload(
            r#"{"sectors": [{"center_angle": 1.0, // deg
                "span_angle": 2.0, "priority": 0.5}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_payload_advisor_keeps_last_response() {
        let scene = Scene::new(vec![]);
        let mut advisor = PayloadAdvisor::new(|_ctx: &FeedbackContext<'_>| {
            Ok(r#"{"sectors":[{"center_angle":90,"span_angle":45,"priority":1}],"confidence":0.5}"#
                .to_string())
        });
        let proposals = advisor.propose(&scene.context()).unwrap();
        assert_eq!(proposals, vec![SectorProposal::new(90.0, 45.0, 1.0)]);
        assert_eq!(advisor.last_response().unwrap().confidence, Some(0.5));
    }

    #[test]
    fn test_goal_bearing_clear_line() {
        let scene = Scene::new(vec![]);
        let proposals = GoalBearingAdvisor::default().propose(&scene.context()).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_relative_eq!(proposals[0].center_angle, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_goal_bearing_deflects_around_blocker() {
        // Blocker sits slightly below the line, so the upper side is favored
        let scene = Scene::new(vec![CircleObstacle::new(5.0, 0.8, 1.0)]);
        let proposals = GoalBearingAdvisor::default().propose(&scene.context()).unwrap();
        assert_eq!(proposals.len(), 3);
        assert!(proposals[0].center_angle > 0.0);
        assert!(proposals[1].center_angle < 0.0);
        assert_relative_eq!(proposals[0].priority, 0.7);
        assert_relative_eq!(proposals[2].priority, 0.2);
        assert!(validate_proposals(&proposals).is_ok());
    }

    #[test]
    fn test_fn_advisor_forwards_errors() {
        let scene = Scene::new(vec![]);
        let mut advisor = from_fn(|_ctx: &FeedbackContext<'_>| {
            Err(FeedbackError::Unavailable("offline".to_string()))
        });
        assert_eq!(
            advisor.propose(&scene.context()),
            Err(FeedbackError::Unavailable("offline".to_string()))
        );
    }

    #[test]
    fn test_timeout_advisor_passes_through_fast_replies() {
        let scene = Scene::new(vec![]);
        let mut advisor =
            TimeoutAdvisor::new(GoalBearingAdvisor::default(), Duration::from_secs(5));
        let proposals = advisor.propose(&scene.context()).unwrap();
        assert_eq!(proposals.len(), 1);
    }

    #[test]
    fn test_timeout_advisor_times_out_and_discards_late_reply() {
        let scene = Scene::new(vec![]);
        let mut calls = 0;
        let slow_first = from_fn(move |ctx: &FeedbackContext<'_>| {
            calls += 1;
            if calls == 1 {
                std::thread::sleep(Duration::from_millis(300));
                return Ok(vec![SectorProposal::new(123.0, 10.0, 1.0)]);
            }
            Ok(vec![SectorProposal::new(ctx.origin.x, 10.0, 1.0)])
        });
        let mut advisor = TimeoutAdvisor::new(slow_first, Duration::from_millis(50));

        assert_eq!(
            advisor.propose(&scene.context()),
            Err(FeedbackError::Timeout(Duration::from_millis(50)))
        );

        std::thread::sleep(Duration::from_millis(400));
        let proposals = advisor.propose(&scene.context()).unwrap();
        assert_eq!(proposals, vec![SectorProposal::new(1.0, 10.0, 1.0)]);
    }
}
