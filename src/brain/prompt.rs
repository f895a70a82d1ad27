// Prompt text sent to the hosted model.

use super::policy::PolicyProfile;
use super::reflection::{BattleSummary, Outcome};
use super::state::{display_stat, AgentState, CoachingProfile, EnemyState, Environment};

fn stance(agent: &AgentState, grounded: &str, airborne: &str) -> String {
    if agent.grounded { grounded } else { airborne }.to_string()
}

fn action_list(profile: &PolicyProfile) -> String {
    profile
        .actions
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prompt for the narrative profile: the commander's free-text instructions
/// plus the full battle snapshot and past lessons.
pub fn narrative_prompt(
    profile: &PolicyProfile,
    agent: &AgentState,
    enemy: &EnemyState,
    environment: &Environment,
    user_prompt: &str,
    lessons: &str,
) -> String {
    let hazards = if environment.hazards.is_empty() {
        "none".to_string()
    } else {
        environment.hazards.join(", ")
    };

    format!(
        r#"You are RooKnight, an AI agent in a combat mission. Your human commander has given you tactical instructions.

USER'S TACTICAL INSTRUCTIONS:
"{user_prompt}"

CURRENT BATTLE STATE:
- Your Health: {health}/100
- Your Energy: {energy}/100
- Position: {position}

ENEMY STATUS:
- Type: {enemy_type}
- Health: {enemy_health}/100
- Distance: {distance} units
- Current State: {enemy_state}

ENVIRONMENT:
- Zone: {zone}
- Lighting: {lighting}
- Hazards: {hazards}

PAST LESSONS LEARNED:
{lessons}

IMPORTANT: Follow the user's tactical instructions as closely as possible. Your success depends on how well you interpret and execute their strategy.

Available actions: {actions}

Respond in JSON format:
{{
  "action": "ACTION_NAME",
  "reasoning": "Brief explanation referencing user's instructions",
  "confidence": 0.0-1.0
}}"#,
        health = display_stat(agent.health),
        energy = display_stat(agent.energy),
        position = stance(agent, "on ground", "airborne"),
        enemy_type = enemy.kind,
        enemy_health = display_stat(enemy.health),
        distance = enemy.distance(),
        enemy_state = enemy.activity.as_str(),
        zone = environment.zone,
        lighting = environment.lighting,
        actions = action_list(profile),
    )
}

/// Prompt for the coaching profile. A custom instruction, when set, replaces
/// the dial-derived guidance; the dial values are still shown.
pub fn coaching_prompt(
    agent: &AgentState,
    enemy: &EnemyState,
    coaching: &CoachingProfile,
    custom: Option<&str>,
    recent_actions: &[String],
) -> String {
    let aggression = coaching.aggression;
    let caution = coaching.caution;

    let mut memory = String::new();
    if !recent_actions.is_empty() {
        memory.push_str("\nRECENT ACTIONS:\n");
        let start = recent_actions.len().saturating_sub(3);
        for line in &recent_actions[start..] {
            memory.push_str(&format!("- {line}\n"));
        }
    }

    let guidance = match custom {
        Some(text) => format!(
            "CUSTOM COACHING INSTRUCTIONS:\n{text}\n\nYou MUST follow these custom instructions above all else while still choosing valid actions."
        ),
        None => {
            let attack = if aggression > 60 {
                "attack often and press advantages"
            } else if aggression > 40 {
                "attack cautiously"
            } else {
                "rarely attack"
            };
            let defend = if caution > 60 {
                "defend frequently and prioritize survival"
            } else if caution > 40 {
                "defend when threatened"
            } else {
                "take risks"
            };
            format!(
                "COACHING INSTRUCTIONS:\n- With aggression {aggression}%, you should {attack}\n- With caution {caution}%, you should {defend}"
            )
        }
    };

    format!(
        r#"You are Thunder, an AI fighter in a 2D combat arena. You must decide your next action.

YOUR COACHING STYLE: {style}
- Aggression Level: {aggression}% (higher = more attacking)
- Caution Level: {caution}% (higher = more defending)

CURRENT SITUATION:
- Your Health: {health}/100 HP
- Your Energy: {energy}/100
- Enemy Health: {enemy_health}/100 HP
- Distance to Enemy: {distance} units (close = <80, medium = 80-200, far = >200)
- You are {position}
{memory}
AVAILABLE ACTIONS:
1. ATTACK - Deal ~15 damage, costs 10 energy, only works when close (<80 units)
2. DEFEND - Reduce incoming damage by 70%, costs 2 energy, lasts 1 second
3. JUMP - Reposition/dodge, costs 5 energy, only works on ground

{guidance}

You MUST respond in this EXACT format:
ACTION: [choose ATTACK, DEFEND, or JUMP]
REASON: [one clear sentence explaining why, referencing your coaching style]

Now decide your action:"#,
        style = if custom.is_some() {
            "CUSTOM - follow the coach's instructions below"
        } else {
            coaching.style()
        },
        health = display_stat(agent.health),
        energy = display_stat(agent.energy),
        enemy_health = display_stat(enemy.health),
        distance = enemy.distance(),
        position = stance(agent, "on ground", "in air"),
    )
}

pub fn reflection_prompt(summary: &BattleSummary, outcome: Outcome) -> String {
    format!(
        r#"You are RooKnight. You just finished a battle.

BATTLE DATA:
- Enemy Type: {enemy}
- Duration: {duration} seconds
- Damage Taken: {taken}
- Damage Dealt: {dealt}
- Actions Used: {actions}
- Outcome: {outcome}

Reflect on this battle. What did you learn? What would you do differently?

Respond in JSON format:
{{
  "lesson": "One sentence key takeaway",
  "improvements": ["specific improvement 1", "specific improvement 2"],
  "confidence_change": "More confident / Less confident / Same"
}}"#,
        enemy = summary.enemy_type,
        duration = summary.duration,
        taken = summary.damage_taken,
        dealt = summary.damage_dealt,
        actions = summary.actions,
        outcome = outcome.as_str(),
    )
}
