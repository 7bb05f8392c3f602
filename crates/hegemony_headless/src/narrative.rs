//! Human-readable engagement reports.
//!
//! Every line is built from the rolls and totals carried on the events; no
//! resolution logic is repeated here.

use std::collections::BTreeMap;

use hegemony_core::battle::EngagementResult;
use hegemony_core::events::{
    BattleEvent, CommanderOutcome, ConclusionReason, CounterfireOutcome, LoggedEvent, Phase,
    RallyOutcome, SkirmishOutcome,
};
use hegemony_core::roster::{ForceId, Side, UnitId, UnitStatus, UnitType};

/// Renders one result's event log.
#[derive(Debug)]
pub struct Narrator<'a> {
    result: &'a EngagementResult,
    unit_types: BTreeMap<UnitId, UnitType>,
}

impl<'a> Narrator<'a> {
    /// Prepare a narrator for a result.
    #[must_use]
    pub fn new(result: &'a EngagementResult) -> Self {
        let unit_types = result.units.iter().map(|u| (u.unit, u.unit_type)).collect();
        Self { result, unit_types }
    }

    /// The full report, one event per line with phase headings.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut current: Option<(Phase, Option<u32>)> = None;

        for logged in &self.result.events {
            let heading = (logged.phase, logged.round);
            if current != Some(heading) {
                out.push_str(&format!("== {} ==\n", phase_heading(logged)));
                current = Some(heading);
            }
            out.push_str(&format!("  {}\n", self.describe(logged)));
        }

        out.push_str("== summary ==\n");
        for side in Side::BOTH {
            out.push_str(&format!(
                "  {}: {} active, {} routed, {} destroyed\n",
                self.force(side),
                self.result.count(side, UnitStatus::Active),
                self.result.count(side, UnitStatus::Routed),
                self.result.count(side, UnitStatus::Destroyed),
            ));
        }
        for report in &self.result.commanders {
            out.push_str(&format!(
                "  {} ({}): {}, level {}\n",
                report.name,
                self.force(report.side),
                commander_outcome(report.outcome),
                report.level
            ));
        }
        out
    }

    /// One line for one event.
    #[must_use]
    pub fn describe(&self, logged: &LoggedEvent) -> String {
        match &logged.event {
            BattleEvent::EngagementStarted {
                force_a,
                force_b,
                units_a,
                units_b,
            } => format!(
                "{} ({units_a} units) engages {} ({units_b} units)",
                label(*force_a),
                label(*force_b)
            ),
            BattleEvent::GarrisonShelled { side, unit } => format!(
                "{} of {} loses its fortifications to bombardment",
                self.unit(*unit),
                self.force(*side)
            ),
            BattleEvent::SkirmishNominated { side, units } => {
                let names: Vec<String> = units.iter().map(|&u| self.unit(u)).collect();
                if names.is_empty() {
                    format!("{} has no skirmishers", self.force(*side))
                } else {
                    format!("{} sends out {}", self.force(*side), names.join(", "))
                }
            }
            BattleEvent::SkirmishAvoided { side } => {
                format!("{} refuses to skirmish; no skirmish is fought", self.force(*side))
            }
            BattleEvent::SkirmishForfeited { side, unit } => format!(
                "{} of {} is no longer fit to fight and forfeits",
                self.unit(*unit),
                self.force(*side)
            ),
            BattleEvent::SkirmishPairing {
                attacker,
                defender,
                attacker_roll,
                attacker_bonus,
                defender_roll,
                defender_bonus,
                margin,
                outcome,
                counterfire,
                ..
            } => {
                let result = match (outcome, counterfire) {
                    (SkirmishOutcome::Held, Some(fire)) => format!(
                        "{} holds and fires back: {}",
                        self.unit(*defender),
                        counterfire_outcome(*fire)
                    ),
                    (SkirmishOutcome::Held, None) => format!("{} holds", self.unit(*defender)),
                    (SkirmishOutcome::Routed, _) => format!("{} is routed", self.unit(*defender)),
                    (SkirmishOutcome::Overrun, _) => {
                        format!("{} is overrun", self.unit(*defender))
                    }
                    (SkirmishOutcome::ImmunityOverride, _) => {
                        format!("{} is beaten but will not break", self.unit(*defender))
                    }
                };
                format!(
                    "{} ({}) attacks {} ({}): margin {margin:+}, {result}",
                    self.unit(*attacker),
                    total(*attacker_roll, *attacker_bonus),
                    self.unit(*defender),
                    total(*defender_roll, *defender_bonus),
                )
            }
            BattleEvent::PitchRoll {
                unit, roll, bonus, ..
            } => format!("{} rolls {}", self.unit(*unit), total(*roll, *bonus)),
            BattleEvent::PitchRound {
                round,
                force_bonus_a,
                force_bonus_b,
                total_a,
                total_b,
                running,
            } => format!(
                "round {round}: {total_a} ({force_bonus_a:+} force) against {total_b} \
                 ({force_bonus_b:+} force), tally {running:+}"
            ),
            BattleEvent::PitchResolved {
                tally,
                winner,
                decisive,
                rounds,
            } => {
                let verdict = match winner {
                    Some(side) => format!("{} carries the field", self.force(*side)),
                    None => "neither side gains ground".to_string(),
                };
                let decisive = if *decisive { " decisively" } else { "" };
                format!("after {rounds} rounds the tally is {tally:+}; {verdict}{decisive}")
            }
            BattleEvent::RallyCheck {
                unit,
                roll,
                bonus,
                rerolled_from,
                outcome,
                ..
            } => {
                let outcome = match outcome {
                    RallyOutcome::Held => "holds",
                    RallyOutcome::Routed => "routs",
                    RallyOutcome::ImmunityOverride => "wavers but will not break",
                };
                format!(
                    "{} rallies {}{}: {outcome}",
                    self.unit(*unit),
                    total(*roll, *bonus),
                    reroll(*rerolled_from)
                )
            }
            BattleEvent::RallyResolved { active_a, active_b } => {
                format!("{active_a} and {active_b} units remain in the line")
            }
            BattleEvent::LoopCapReached { loops } => {
                format!("the fighting is broken off after {loops} exchanges")
            }
            BattleEvent::CasualtyCheck {
                unit,
                roll,
                destroy_at_or_below,
                rerolled_from,
                status,
                ..
            } => {
                let fate = if *status == UnitStatus::Destroyed {
                    "is destroyed"
                } else {
                    "survives"
                };
                format!(
                    "{} rolls {roll}{} against {destroy_at_or_below}: {fate}",
                    self.unit(*unit),
                    reroll(*rerolled_from)
                )
            }
            BattleEvent::CommanderCheck {
                side,
                roll,
                rerolled_from,
                outcome,
            } => format!(
                "commander of {} rolls {roll}{}: {}",
                self.force(*side),
                reroll(*rerolled_from),
                commander_outcome(*outcome)
            ),
            BattleEvent::EngagementConcluded { winner, reason } => {
                let how = match reason {
                    ConclusionReason::Rout => "by rout",
                    ConclusionReason::MutualRout => "as both lines break",
                    ConclusionReason::DecisivePitch => "by a decisive pitch",
                    ConclusionReason::LoopCap => "when the fighting is broken off",
                };
                match winner {
                    Some(side) => format!("{} wins {how}", self.force(*side)),
                    None => format!("the engagement is drawn {how}"),
                }
            }
        }
    }

    fn unit(&self, id: UnitId) -> String {
        match self.unit_types.get(&id) {
            Some(unit_type) => format!("{unit_type} {id}"),
            None => format!("unit {id}"),
        }
    }

    fn force(&self, side: Side) -> String {
        label(self.result.forces[side.index()])
    }
}

/// Render a result in one call.
#[must_use]
pub fn render(result: &EngagementResult) -> String {
    Narrator::new(result).render()
}

fn label(force: ForceId) -> String {
    force.to_string()
}

fn total(roll: u32, bonus: i32) -> String {
    format!("{roll}{bonus:+} = {}", i64::from(roll) + i64::from(bonus))
}

fn reroll(first: Option<u32>) -> String {
    first.map_or_else(String::new, |r| format!(" (rerolled {r})"))
}

fn phase_heading(logged: &LoggedEvent) -> String {
    match logged.round {
        Some(round) => format!("{} {round}", logged.phase),
        None => logged.phase.to_string(),
    }
}

fn counterfire_outcome(outcome: CounterfireOutcome) -> String {
    match outcome {
        CounterfireOutcome::Routed {
            roll,
            destroy_at_or_below,
        } => format!("attacker routs, rolls {roll} against {destroy_at_or_below} and survives"),
        CounterfireOutcome::Destroyed {
            roll,
            destroy_at_or_below,
        } => format!("attacker routs, rolls {roll} against {destroy_at_or_below} and is destroyed"),
        CounterfireOutcome::ImmunityOverride => "attacker is shaken but will not break".to_string(),
    }
}

fn commander_outcome(outcome: CommanderOutcome) -> String {
    match outcome {
        CommanderOutcome::None => "no change".to_string(),
        CommanderOutcome::Captured => "captured".to_string(),
        CommanderOutcome::Promoted { from, to } => format!("promoted from {from} to {to}"),
    }
}
