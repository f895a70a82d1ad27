// Deterministic decision policy: a priority-ordered guard chain driven by a
// per-profile rule table.
//
// The engine is written once; the narrative and coaching profiles differ only
// in their tables, action sets and fallback decisions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::action::Action;
use super::state::{display_stat, AgentState, Decision, EnemyActivity, EnemyState};

const ERROR_SNIPPET_CHARS: usize = 50;

// ── Profiles ──────────────────────────────────────────────────────────

/// Which backend variant the brain runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Free-text tactical prompt, wide action set, runs without a model key.
    Narrative,
    /// Numeric aggression/caution dials, three actions, requires a model key.
    Coaching,
}

impl ProfileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Narrative => "narrative",
            ProfileKind::Coaching => "coaching",
        }
    }

    /// Whether a missing model key must abort startup.
    pub fn requires_model(self) -> bool {
        matches!(self, ProfileKind::Coaching)
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "narrative" => Ok(ProfileKind::Narrative),
            "coaching" => Ok(ProfileKind::Coaching),
            other => Err(format!("unknown brain profile: {other}")),
        }
    }
}

// ── Rule table ────────────────────────────────────────────────────────

/// Guard evaluated against the current snapshot. Comparisons are strict.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    AgentHealthBelow(f64),
    /// Agent below `agent` and enemy below `enemy`.
    BothHealthBelow { agent: f64, enemy: f64 },
    /// Enemy attacking and closer than the given distance.
    EnemyAttackingWithin(f64),
    EnemyAttacking,
    /// `min < distance < max`.
    DistanceBetween { min: f64, max: f64 },
    DistanceBelow(f64),
    DistanceAbove(f64),
    Always,
}

impl Condition {
    pub fn matches(&self, agent: &AgentState, enemy: &EnemyState) -> bool {
        let distance = enemy.distance();
        let attacking = enemy.activity == EnemyActivity::Attacking;
        match *self {
            Condition::AgentHealthBelow(h) => agent.health < h,
            Condition::BothHealthBelow {
                agent: a,
                enemy: e,
            } => agent.health < a && enemy.health < e,
            Condition::EnemyAttackingWithin(d) => attacking && distance < d,
            Condition::EnemyAttacking => attacking,
            Condition::DistanceBetween { min, max } => min < distance && distance < max,
            Condition::DistanceBelow(d) => distance < d,
            Condition::DistanceAbove(d) => distance > d,
            Condition::Always => true,
        }
    }
}

/// A candidate outcome. `reasoning` is a template; see [`render_reasoning`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub action: Action,
    pub confidence: f64,
    pub reasoning: &'static str,
}

impl Choice {
    pub const fn new(action: Action, confidence: f64, reasoning: &'static str) -> Self {
        Self {
            action,
            confidence,
            reasoning,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub when: Condition,
    /// Weighted outcomes; a single entry means no randomness.
    pub choices: Vec<(f64, Choice)>,
}

impl Rule {
    pub fn fixed(when: Condition, choice: Choice) -> Self {
        Self {
            when,
            choices: vec![(1.0, choice)],
        }
    }

    pub fn weighted(when: Condition, choices: Vec<(f64, Choice)>) -> Self {
        Self { when, choices }
    }
}

/// Pick one item by weight using a single uniform draw in `[0, 1)`.
///
/// Items are walked in order, so `[(0.7, a), (0.3, b)]` yields `a` exactly
/// when the draw is below 0.7. Returns `None` only for an empty slice.
pub fn weighted_choice<'a, T, R: Rng + ?Sized>(items: &'a [(f64, T)], rng: &mut R) -> Option<&'a T> {
    let total: f64 = items.iter().map(|(w, _)| w.max(0.0)).sum();
    if items.is_empty() {
        return None;
    }
    if total <= 0.0 {
        return items.first().map(|(_, item)| item);
    }
    let roll = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (weight, item) in items {
        cumulative += weight.max(0.0);
        if roll < cumulative {
            return Some(item);
        }
    }
    items.last().map(|(_, item)| item)
}

/// Fill `{health}`, `{energy}`, `{enemy_health}`, `{enemy}`, `{enemy_state}`
/// and `{distance}` placeholders.
pub fn render_reasoning(template: &str, agent: &AgentState, enemy: &EnemyState) -> String {
    template
        .replace("{health}", &display_stat(agent.health))
        .replace("{energy}", &display_stat(agent.energy))
        .replace("{enemy_health}", &display_stat(enemy.health))
        .replace("{enemy_state}", enemy.activity.as_str())
        .replace("{enemy}", &enemy.kind)
        .replace("{distance}", &format!("{:.0}", enemy.distance()))
}

fn error_snippet(error: &dyn fmt::Display) -> String {
    error.to_string().chars().take(ERROR_SNIPPET_CHARS).collect()
}

// ── Policy ────────────────────────────────────────────────────────────

/// Rule table plus the fixed decisions substituted on failure.
#[derive(Debug, Clone)]
pub struct PolicyProfile {
    pub kind: ProfileKind,
    /// Actions a model response may name for this profile.
    pub actions: Vec<Action>,
    pub rules: Vec<Rule>,
    /// Used when no rule matches.
    pub default_choice: Choice,
    /// Used when a model response cannot be parsed or names a foreign action.
    pub parse_fallback: Choice,
    /// Used when the model call itself fails. `{error}` is replaced with a
    /// short snippet of the failure.
    pub error_fallback: Choice,
}

impl PolicyProfile {
    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Narrative => Self::narrative(),
            ProfileKind::Coaching => Self::coaching(),
        }
    }

    /// Wide action set with the distance/health guard chain.
    pub fn narrative() -> Self {
        use Action::*;
        use Condition::*;

        let observe = Choice::new(WaitAndObserve, 0.70, "Analyzing the situation...");

        let rules = vec![
            Rule::fixed(
                AgentHealthBelow(25.0),
                Choice::new(Retreat, 0.95, "Critical health ({health} HP)! Must retreat to survive"),
            ),
            Rule::fixed(
                BothHealthBelow {
                    agent: 40.0,
                    enemy: 30.0,
                },
                Choice::new(
                    JumpAttack,
                    0.88,
                    "Both wounded ({health} vs {enemy_health} HP) - finishing blow!",
                ),
            ),
            Rule::weighted(
                AgentHealthBelow(40.0),
                vec![
                    (
                        0.7,
                        Choice::new(Dodge, 0.82, "Low health ({health} HP) - staying mobile and defensive"),
                    ),
                    (
                        0.3,
                        Choice::new(Block, 0.78, "Low health ({health} HP) - blocking incoming attacks"),
                    ),
                ],
            ),
            Rule::fixed(
                EnemyAttackingWithin(30.0),
                Choice::new(Dodge, 0.92, "Enemy attacking at {distance} units! Evading now!"),
            ),
            Rule::fixed(
                EnemyAttacking,
                Choice::new(MoveAway, 0.85, "Enemy attacking from {distance} units - creating distance"),
            ),
            Rule::weighted(
                DistanceBetween {
                    min: 10.0,
                    max: 25.0,
                },
                vec![
                    (
                        0.5,
                        Choice::new(Attack, 0.90, "Perfect range at {distance} units! Strike now!"),
                    ),
                    (
                        0.5,
                        Choice::new(JumpAttack, 0.90, "Perfect range at {distance} units! Aerial assault!"),
                    ),
                ],
            ),
            Rule::weighted(
                DistanceBelow(10.0),
                vec![
                    (
                        0.6,
                        Choice::new(Attack, 0.87, "Point-blank range ({distance} units) - quick strike!"),
                    ),
                    (
                        0.4,
                        Choice::new(Dodge, 0.83, "Too close ({distance} units) - need space to maneuver"),
                    ),
                ],
            ),
            Rule::fixed(
                DistanceAbove(80.0),
                Choice::new(MoveCloser, 0.80, "Enemy too far ({distance} units) - closing the gap"),
            ),
            Rule::weighted(
                DistanceAbove(40.0),
                vec![
                    (
                        0.4,
                        Choice::new(MoveCloser, 0.75, "Moving into attack range from {distance} units"),
                    ),
                    (
                        0.6,
                        Choice::new(
                            WaitAndObserve,
                            0.72,
                            "Studying enemy patterns at {distance} units",
                        ),
                    ),
                ],
            ),
            Rule::fixed(Always, observe),
        ];

        Self {
            kind: ProfileKind::Narrative,
            actions: vec![
                Attack,
                Dodge,
                Block,
                WaitAndObserve,
                Retreat,
                JumpAttack,
                MoveCloser,
                MoveAway,
            ],
            rules,
            default_choice: observe,
            parse_fallback: Choice::new(WaitAndObserve, 0.5, "Analyzing the situation..."),
            error_fallback: Choice::new(Block, 0.6, "Defensive stance while recalculating"),
        }
    }

    /// Three-action profile steered by the hosted model. Locally it only
    /// ever holds a defensive stance.
    pub fn coaching() -> Self {
        use Action::*;

        let defend = Choice::new(Defend, 0.5, "Holding a defensive stance until the coach weighs in");
        Self {
            kind: ProfileKind::Coaching,
            actions: vec![Attack, Defend, Jump],
            rules: vec![Rule::fixed(Condition::Always, defend)],
            default_choice: defend,
            parse_fallback: Choice::new(Defend, 0.5, "Analyzing situation and executing strategy..."),
            error_fallback: Choice::new(Defend, 0.5, "AI thinking... (error: {error})"),
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    /// Run the guard chain. First matching rule wins.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        agent: &AgentState,
        enemy: &EnemyState,
        rng: &mut R,
    ) -> Decision {
        let choice = self
            .rules
            .iter()
            .find(|rule| rule.when.matches(agent, enemy))
            .and_then(|rule| weighted_choice(&rule.choices, rng))
            .copied()
            .unwrap_or(self.default_choice);

        Decision::new(
            choice.action,
            render_reasoning(choice.reasoning, agent, enemy),
            choice.confidence,
        )
    }

    pub fn parse_fallback_decision(&self) -> Decision {
        let c = self.parse_fallback;
        Decision::new(c.action, c.reasoning, c.confidence)
    }

    pub fn error_fallback_decision(&self, error: &dyn fmt::Display) -> Decision {
        let c = self.error_fallback;
        Decision::new(
            c.action,
            c.reasoning.replace("{error}", &error_snippet(error)),
            c.confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Always draws 0.0.
    fn low_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    /// Always draws just under 1.0.
    fn high_rng() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn agent(health: f64) -> AgentState {
        AgentState {
            health,
            ..AgentState::default()
        }
    }

    fn enemy(health: f64, distance: f64, activity: EnemyActivity) -> EnemyState {
        EnemyState {
            kind: "Nyx, Owl Warden".into(),
            health,
            distance: Some(distance),
            activity,
        }
    }

    #[test]
    fn test_critical_health_always_retreats() {
        let policy = PolicyProfile::narrative();
        let mut rng = StdRng::seed_from_u64(7);
        for health in [0.0, 10.0, 24.0, 24.9] {
            for distance in [0.0, 5.0, 15.0, 50.0, 200.0] {
                for activity in [EnemyActivity::Idle, EnemyActivity::Attacking] {
                    let d = policy.decide(&agent(health), &enemy(10.0, distance, activity), &mut rng);
                    assert_eq!(d.action, Action::Retreat);
                    assert_eq!(d.confidence, 0.95);
                }
            }
        }
    }

    #[test]
    fn test_example_retreat_scenario() {
        let policy = PolicyProfile::narrative();
        let d = policy.decide(&agent(20.0), &enemy(80.0, 50.0, EnemyActivity::Idle), &mut low_rng());
        assert_eq!(d.action, Action::Retreat);
        assert_eq!(d.confidence, 0.95);
        assert!(d.reasoning.contains("20 HP"));
    }

    #[test]
    fn test_fractional_health_thresholds() {
        let policy = PolicyProfile::narrative();
        let far = enemy(80.0, 50.0, EnemyActivity::Idle);

        let d = policy.decide(&agent(24.99), &far, &mut low_rng());
        assert_eq!(d.action, Action::Retreat);
        assert_eq!(d.reasoning, "Critical health (25.0 HP)! Must retreat to survive");

        // Exactly 25 is not critical; 39.5 is still low.
        let d = policy.decide(&agent(25.0), &far, &mut low_rng());
        assert_eq!(d.action, Action::Dodge);
        let d = policy.decide(&agent(39.5), &far, &mut high_rng());
        assert_eq!(d.action, Action::Block);
        assert!(d.reasoning.contains("39.5 HP"));

        let d = policy.decide(&agent(40.0), &far, &mut high_rng());
        assert_eq!(d.action, Action::WaitAndObserve);

        let d = policy.decide(&agent(39.0), &enemy(29.9, 50.0, EnemyActivity::Idle), &mut high_rng());
        assert_eq!(d.action, Action::JumpAttack);
    }

    #[test]
    fn test_finishing_blow_is_deterministic() {
        let policy = PolicyProfile::narrative();
        for health in (25..40).map(f64::from) {
            for mut rng in [low_rng(), high_rng()] {
                let d = policy.decide(
                    &agent(health),
                    &enemy(29.0, 5.0, EnemyActivity::Attacking),
                    &mut rng,
                );
                assert_eq!(d.action, Action::JumpAttack);
                assert_eq!(d.confidence, 0.88);
            }
        }
    }

    #[test]
    fn test_low_health_both_branches() {
        let policy = PolicyProfile::narrative();
        let e = enemy(30.0, 50.0, EnemyActivity::Idle);

        let d = policy.decide(&agent(30.0), &e, &mut low_rng());
        assert_eq!(d.action, Action::Dodge);
        assert_eq!(d.confidence, 0.82);

        let d = policy.decide(&agent(30.0), &e, &mut high_rng());
        assert_eq!(d.action, Action::Block);
        assert_eq!(d.confidence, 0.78);
    }

    #[test]
    fn test_low_health_dodge_ratio() {
        let policy = PolicyProfile::narrative();
        let mut rng = StdRng::seed_from_u64(42);
        let e = enemy(60.0, 50.0, EnemyActivity::Idle);
        let draws = 10_000;
        let mut dodges = 0;
        for _ in 0..draws {
            let d = policy.decide(&agent(35.0), &e, &mut rng);
            match d.action {
                Action::Dodge => dodges += 1,
                Action::Block => {}
                other => panic!("unexpected action {other}"),
            }
        }
        let ratio = dodges as f64 / draws as f64;
        assert!((0.67..0.73).contains(&ratio), "dodge ratio {ratio}");
    }

    #[test]
    fn test_attacking_enemy_close_and_far() {
        let policy = PolicyProfile::narrative();
        let d = policy.decide(&agent(100.0), &enemy(100.0, 29.0, EnemyActivity::Attacking), &mut low_rng());
        assert_eq!(d.action, Action::Dodge);
        assert_eq!(d.confidence, 0.92);

        let d = policy.decide(&agent(100.0), &enemy(100.0, 90.0, EnemyActivity::Attacking), &mut low_rng());
        assert_eq!(d.action, Action::MoveAway);
        assert_eq!(d.confidence, 0.85);

        // Boundary: exactly 30 is not "close".
        let d = policy.decide(&agent(100.0), &enemy(100.0, 30.0, EnemyActivity::Attacking), &mut low_rng());
        assert_eq!(d.action, Action::MoveAway);
    }

    #[test]
    fn test_perfect_range() {
        let policy = PolicyProfile::narrative();
        let e = enemy(100.0, 15.0, EnemyActivity::Idle);

        let d = policy.decide(&agent(100.0), &e, &mut low_rng());
        assert_eq!(d.action, Action::Attack);
        assert_eq!(d.confidence, 0.90);

        let d = policy.decide(&agent(100.0), &e, &mut high_rng());
        assert_eq!(d.action, Action::JumpAttack);
        assert_eq!(d.confidence, 0.90);
    }

    #[test]
    fn test_distance_band_edges() {
        let policy = PolicyProfile::narrative();
        let idle = |d| enemy(100.0, d, EnemyActivity::Idle);

        // 10 is neither "perfect range" nor "point blank": falls to observe.
        let d = policy.decide(&agent(100.0), &idle(10.0), &mut low_rng());
        assert_eq!(d.action, Action::WaitAndObserve);
        assert_eq!(d.confidence, 0.70);

        // 25 is outside the perfect band and not beyond 40.
        let d = policy.decide(&agent(100.0), &idle(25.0), &mut low_rng());
        assert_eq!(d.action, Action::WaitAndObserve);

        let d = policy.decide(&agent(100.0), &idle(40.0), &mut low_rng());
        assert_eq!(d.action, Action::WaitAndObserve);
        assert_eq!(d.confidence, 0.70);
    }

    #[test]
    fn test_point_blank() {
        let policy = PolicyProfile::narrative();
        let e = enemy(100.0, 3.0, EnemyActivity::Idle);

        let d = policy.decide(&agent(100.0), &e, &mut low_rng());
        assert_eq!((d.action, d.confidence), (Action::Attack, 0.87));

        let d = policy.decide(&agent(100.0), &e, &mut high_rng());
        assert_eq!((d.action, d.confidence), (Action::Dodge, 0.83));
    }

    #[test]
    fn test_far_and_medium_range() {
        let policy = PolicyProfile::narrative();

        let d = policy.decide(&agent(100.0), &enemy(100.0, 81.0, EnemyActivity::Idle), &mut high_rng());
        assert_eq!((d.action, d.confidence), (Action::MoveCloser, 0.80));

        let e = enemy(100.0, 60.0, EnemyActivity::Idle);
        let d = policy.decide(&agent(100.0), &e, &mut low_rng());
        assert_eq!((d.action, d.confidence), (Action::MoveCloser, 0.75));

        let d = policy.decide(&agent(100.0), &e, &mut high_rng());
        assert_eq!((d.action, d.confidence), (Action::WaitAndObserve, 0.72));
        assert!(d.reasoning.contains("60 units"));
    }

    #[test]
    fn test_other_activity_is_not_attacking() {
        let policy = PolicyProfile::narrative();
        let e = enemy(100.0, 90.0, EnemyActivity::Other("charging".into()));
        let d = policy.decide(&agent(100.0), &e, &mut low_rng());
        assert_eq!(d.action, Action::MoveCloser);
    }

    #[test]
    fn test_empty_rule_table_uses_default() {
        let mut policy = PolicyProfile::narrative();
        policy.rules.clear();
        let d = policy.decide(&agent(10.0), &enemy(10.0, 5.0, EnemyActivity::Idle), &mut low_rng());
        assert_eq!(d.action, Action::WaitAndObserve);
        assert_eq!(d.confidence, 0.70);
    }

    #[test]
    fn test_coaching_local_policy_defends() {
        let policy = PolicyProfile::coaching();
        let d = policy.decide(&agent(10.0), &enemy(10.0, 5.0, EnemyActivity::Attacking), &mut high_rng());
        assert_eq!(d.action, Action::Defend);
        assert_eq!(d.confidence, 0.5);
    }

    #[test]
    fn test_error_fallbacks() {
        let narrative = PolicyProfile::narrative().error_fallback_decision(&"boom");
        assert_eq!(narrative.action, Action::Block);
        assert_eq!(narrative.confidence, 0.6);

        let long = "x".repeat(200);
        let coaching = PolicyProfile::coaching().error_fallback_decision(&long);
        assert_eq!(coaching.action, Action::Defend);
        assert_eq!(coaching.confidence, 0.5);
        assert_eq!(
            coaching.reasoning,
            format!("AI thinking... (error: {})", "x".repeat(50))
        );
    }

    #[test]
    fn test_weighted_choice_edges() {
        let empty: [(f64, u8); 0] = [];
        assert_eq!(weighted_choice(&empty, &mut low_rng()), None);

        let items = [(0.0, 'a'), (0.0, 'b')];
        assert_eq!(weighted_choice(&items, &mut high_rng()), Some(&'a'));

        let items = [(1.0, 'a'), (3.0, 'b')];
        assert_eq!(weighted_choice(&items, &mut low_rng()), Some(&'a'));
        assert_eq!(weighted_choice(&items, &mut high_rng()), Some(&'b'));
    }

    #[test]
    fn test_profile_kind_parsing() {
        assert_eq!("Narrative".parse::<ProfileKind>().unwrap(), ProfileKind::Narrative);
        assert_eq!("coaching".parse::<ProfileKind>().unwrap(), ProfileKind::Coaching);
        assert!("arcade".parse::<ProfileKind>().is_err());
        assert!(ProfileKind::Coaching.requires_model());
        assert!(!ProfileKind::Narrative.requires_model());
    }
}
