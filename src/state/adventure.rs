use std::{fmt, str::FromStr};

use thiserror::Error;

/// Prefix of every button custom id owned by the adventure.
pub const CHOICE_ID_PREFIX: &str = "adventure:";

/// Non-terminal positions of the branching story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdventureStage {
    /// Freshly started: forest or village.
    Crossroads,
    /// Facing the bear: fight or flee.
    Forest,
    /// Talking to the old man: pick the quiz language.
    Village,
}

/// Language the quiz questions are generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuizLanguage {
    /// Bahasa Indonesia.
    Indonesian,
    /// English.
    English,
}

impl QuizLanguage {
    /// Name used inside the generation prompt and in chat.
    pub fn display_name(&self) -> &'static str {
        match self {
            QuizLanguage::Indonesian => "Bahasa Indonesia",
            QuizLanguage::English => "English",
        }
    }
}

/// A single button press inside the adventure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdventureChoice {
    /// Start: walk into the forest.
    EnterForest,
    /// Start: head to the village.
    GoToVillage,
    /// Forest: stand and fight.
    FightBear,
    /// Forest: run.
    FleeBear,
    /// Village: quiz in the given language.
    Language(QuizLanguage),
}

/// Where a choice leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdventureOutcome {
    /// Story continues at the given stage.
    Continue(AdventureStage),
    /// Terminal: the bear won.
    Defeated,
    /// Terminal: survived but lost in the woods.
    Escaped,
    /// The adventure session is replaced by a quiz in this language.
    StartQuiz(QuizLanguage),
}

/// Raised when a choice does not belong to the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid choice: {choice:?} cannot be made while in {stage:?}")]
pub struct InvalidChoice {
    /// Stage the choice was made in.
    pub stage: AdventureStage,
    /// The rejected choice.
    pub choice: AdventureChoice,
}

/// Raised when a button id does not encode an adventure choice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown adventure choice `{0}`")]
pub struct UnknownChoice(pub String);

impl AdventureStage {
    /// The two choices offered at this stage, in display order.
    pub fn choices(&self) -> [AdventureChoice; 2] {
        match self {
            AdventureStage::Crossroads => {
                [AdventureChoice::EnterForest, AdventureChoice::GoToVillage]
            }
            AdventureStage::Forest => [AdventureChoice::FightBear, AdventureChoice::FleeBear],
            AdventureStage::Village => [
                AdventureChoice::Language(QuizLanguage::Indonesian),
                AdventureChoice::Language(QuizLanguage::English),
            ],
        }
    }

    /// Compute the outcome of `choice` made at this stage.
    pub fn transition(&self, choice: AdventureChoice) -> Result<AdventureOutcome, InvalidChoice> {
        let outcome = match (self, choice) {
            (AdventureStage::Crossroads, AdventureChoice::EnterForest) => {
                AdventureOutcome::Continue(AdventureStage::Forest)
            }
            (AdventureStage::Crossroads, AdventureChoice::GoToVillage) => {
                AdventureOutcome::Continue(AdventureStage::Village)
            }
            (AdventureStage::Forest, AdventureChoice::FightBear) => AdventureOutcome::Defeated,
            (AdventureStage::Forest, AdventureChoice::FleeBear) => AdventureOutcome::Escaped,
            (AdventureStage::Village, AdventureChoice::Language(language)) => {
                AdventureOutcome::StartQuiz(language)
            }
            (stage, choice) => {
                return Err(InvalidChoice {
                    stage: *stage,
                    choice,
                });
            }
        };

        Ok(outcome)
    }
}

impl AdventureChoice {
    fn slug(&self) -> &'static str {
        match self {
            AdventureChoice::EnterForest => "forest",
            AdventureChoice::GoToVillage => "village",
            AdventureChoice::FightBear => "fight",
            AdventureChoice::FleeBear => "flee",
            AdventureChoice::Language(QuizLanguage::Indonesian) => "lang-id",
            AdventureChoice::Language(QuizLanguage::English) => "lang-en",
        }
    }

    /// Button custom id carrying this choice.
    pub fn custom_id(&self) -> String {
        format!("{CHOICE_ID_PREFIX}{}", self.slug())
    }
}

impl fmt::Display for AdventureChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AdventureChoice {
    type Err = UnknownChoice;

    fn from_str(custom_id: &str) -> Result<Self, Self::Err> {
        let slug = custom_id
            .strip_prefix(CHOICE_ID_PREFIX)
            .ok_or_else(|| UnknownChoice(custom_id.to_string()))?;
        let choice = match slug {
            "forest" => AdventureChoice::EnterForest,
            "village" => AdventureChoice::GoToVillage,
            "fight" => AdventureChoice::FightBear,
            "flee" => AdventureChoice::FleeBear,
            "lang-id" => AdventureChoice::Language(QuizLanguage::Indonesian),
            "lang-en" => AdventureChoice::Language(QuizLanguage::English),
            _ => return Err(UnknownChoice(custom_id.to_string())),
        };
        Ok(choice)
    }
}
