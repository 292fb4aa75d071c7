//! Rule-based fallback classifier.
//!
//! An ordered cascade of tiers, most severe first. Each tier is a boolean
//! combination of substring tests over the lower-cased context. The first
//! tier that matches decides the verdict and score; the reasoning is drawn
//! uniformly from that tier's response pool. The last tier always matches.

use rand::Rng;
use tracing::debug;

use super::types::{combine_context, JudgmentResult, Verdict};

// =============================================================================
// Predicates
// =============================================================================

/// A boolean expression over substring containment.
#[derive(Debug, Clone, Copy)]
pub enum Clause {
    /// Text contains the phrase.
    Phrase(&'static str),
    /// At least one sub-clause holds.
    AnyOf(&'static [Clause]),
    /// Every sub-clause holds.
    AllOf(&'static [Clause]),
    /// The sub-clause does not hold.
    Not(&'static Clause),
    /// Always holds.
    Always,
}

impl Clause {
    /// Evaluate against already lower-cased text.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Clause::Phrase(p) => text.contains(p),
            Clause::AnyOf(cs) => cs.iter().any(|c| c.matches(text)),
            Clause::AllOf(cs) => cs.iter().all(|c| c.matches(text)),
            Clause::Not(c) => !c.matches(text),
            Clause::Always => true,
        }
    }
}

macro_rules! has {
    ($s:literal) => {
        Clause::Phrase($s)
    };
}

macro_rules! phrases {
    ($($s:literal),+ $(,)?) => {
        Clause::AnyOf(&[$(Clause::Phrase($s)),+])
    };
}

macro_rules! any_of {
    ($($c:expr),+ $(,)?) => {
        Clause::AnyOf(&[$($c),+])
    };
}

macro_rules! all_of {
    ($($c:expr),+ $(,)?) => {
        Clause::AllOf(&[$($c),+])
    };
}

// =============================================================================
// Tiers
// =============================================================================

/// One rung of the cascade.
#[derive(Debug)]
pub struct Tier {
    pub name: &'static str,
    pub when: Clause,
    pub verdict: Verdict,
    pub score: u8,
    pub responses: &'static [&'static str],
}

impl Tier {
    /// Pick one reasoning string uniformly at random.
    pub fn pick_response<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        self.responses[rng.gen_range(0..self.responses.len())]
    }

    pub fn judge<R: Rng + ?Sized>(&self, rng: &mut R) -> JudgmentResult {
        JudgmentResult::new(self.verdict, self.score as i64, self.pick_response(rng))
    }
}

pub static TIERS: [Tier; 10] = [
    Tier {
        name: "violence_against_vulnerable",
        when: all_of![
            phrases!["kicked", "hit", "punched", "slapped", "pushed", "shoved", "beat", "abused"],
            phrases![
                "kid", "child", "baby", "toddler", "minor", "elderly", "old person", "disabled",
                "animal", "pet", "dog", "cat",
            ],
        ],
        verdict: Verdict::Asshole,
        score: 10,
        responses: &[
            "Violence against a child is absolutely unacceptable. This is clearly wrong and you are the asshole.",
            "Physical harm to a child is not just asshole behavior - it's potentially criminal. You are clearly in the wrong here.",
            "You physically harmed a child. This is absolutely unacceptable and wrong. You are clearly the asshole here.",
            "Violence against a vulnerable person, especially a child, is never acceptable. You are definitely the asshole.",
        ],
    },
    Tier {
        name: "sexual_misconduct_or_doxxing",
        when: any_of![
            has!("sexual assault"),
            has!("raped"),
            has!("revenge porn"),
            all_of![has!("nude"), has!("shared")],
            has!("doxxed"),
            has!("doxxing"),
            all_of![has!("leaked"), phrases!["address", "phone", "personal"]],
        ],
        verdict: Verdict::Asshole,
        score: 10,
        responses: &[
            "This is literally illegal and you're asking if you're wrong? YES. You're not just an asshole, you're a criminal.",
            "Bro this is giving \"I committed a crime and want validation\" energy. No. Absolutely not. You're 100% the asshole.",
            "This is beyond asshole behavior. This is \"call the police\" behavior. What is wrong with you?",
            "You did WHAT? And you think there's any scenario where you're NOT the asshole? Delusional.",
        ],
    },
    Tier {
        name: "physical_violence",
        when: any_of![
            has!("kicked"),
            has!("hit"),
            has!("punched"),
            has!("violence"),
            has!("slapped"),
            has!("beat"),
            has!("assaulted"),
            has!("attacked"),
            all_of![has!("threw"), has!("at")],
            has!("choked"),
            has!("strangled"),
        ],
        verdict: Verdict::Asshole,
        score: 9,
        responses: &[
            "Bro, you literally did something that would make a villain in a kids movie look like a saint. This is WILD.",
            "Okay so you're out here doing crimes and asking if you're the asshole? Yes. Obviously. The audacity is astronomical.",
            "This is giving \"I know I messed up but maybe if I ask nicely people will say it's fine\" energy. It's not fine. You're absolutely the asshole here.",
            "You did WHAT? And you're asking if YOU'RE the problem? The math ain't mathing, my friend.",
        ],
    },
    Tier {
        name: "bigotry",
        when: phrases![
            "racist", "racism", "homophobic", "homophobia", "transphobic", "transphobia", "ableist",
            "ableism", "fat shamed", "fat shaming", "body shamed", "body shaming", "slur", "n-word",
            "f slur", "r-word",
        ],
        verdict: Verdict::Asshole,
        score: 9,
        responses: &[
            "Discrimination and bigotry are never acceptable. You are clearly the asshole here.",
            "Prejudiced behavior is wrong regardless of context. You are the asshole.",
            "Discrimination is never okay. You are clearly in the wrong here.",
            "This type of discriminatory behavior is unacceptable. You are the asshole.",
        ],
    },
    Tier {
        name: "serious_wrongdoing",
        when: phrases![
            "cheated", "lied", "stole", "betrayed", "abused", "manipulated", "gaslighted",
            "gaslighting", "stalked", "stalking", "threatened", "threat", "blackmailed", "blackmail",
        ],
        verdict: Verdict::Asshole,
        score: 8,
        responses: &[
            "This behavior is clearly wrong and harmful. You are the asshole here.",
            "These actions are unacceptable and harmful to others. You are in the wrong.",
            "This type of behavior is not acceptable. You are the asshole.",
            "What you did was wrong and harmful. You are clearly the asshole in this situation.",
        ],
    },
    Tier {
        name: "inconsiderate",
        when: any_of![
            has!("selfish"),
            has!("only thinking about myself"),
            has!("ignored"),
            has!("dismissed"),
            has!("refused to help"),
            has!("ghosted"),
            has!("ghosting"),
            has!("publicly humiliated"),
            all_of![has!("embarrassed"), has!("public")],
            has!("made fun of"),
            has!("mocked"),
            has!("laughed at"),
            has!("ridiculed"),
            all_of![has!("canceled"), has!("birthday")],
            all_of![has!("ruined"), phrases!["wedding", "party", "event"]],
        ],
        verdict: Verdict::Asshole,
        score: 7,
        responses: &[
            "This behavior shows a lack of consideration for others. You are the asshole here.",
            "Being this self-centered and ignoring others' feelings is wrong. You are the asshole.",
            "This demonstrates a lack of empathy and consideration for others. You are in the wrong.",
            "Putting your own needs above others without consideration makes you the asshole.",
        ],
    },
    Tier {
        name: "verbal_aggression",
        when: any_of![
            has!("yelled at"),
            has!("screamed at"),
            has!("cussed out"),
            has!("cursed at"),
            has!("insulted"),
            has!("name called"),
            all_of![has!("called"), phrases!["stupid", "idiot", "dumb"]],
        ],
        verdict: Verdict::Asshole,
        score: 6,
        responses: &[
            "Verbal aggression is not acceptable behavior. You are the asshole here.",
            "Losing your temper and being verbally aggressive is wrong, even when frustrated. You are the asshole.",
            "Verbal attacks are harmful and unacceptable. You are in the wrong here.",
            "Being verbally aggressive toward someone is not acceptable. You are the asshole.",
        ],
    },
    Tier {
        name: "decent_behavior",
        when: any_of![
            has!("sorry"),
            has!("apologize"),
            has!("tried to help"),
            has!("did my best"),
            has!("boundary"),
            has!("respect"),
            all_of![has!("stood up"), phrases!["bully", "abuse"]],
            has!("protected"),
            has!("defended"),
            all_of![has!("reported"), phrases!["abuse", "harassment", "crime"]],
            has!("said no"),
            all_of![has!("refused"), has!("uncomfortable")],
            has!("walked away"),
            all_of![has!("left"), has!("toxic")],
            all_of![has!("cut off"), has!("toxic")],
            all_of![has!("stopped"), has!("abuse")],
        ],
        verdict: Verdict::NotAsshole,
        score: 2,
        responses: &[
            "You're out here being a decent human being and someone is mad about it? That's their problem, not yours.",
            "You did nothing wrong and honestly, whoever is making you feel bad about this needs to touch grass.",
            "This is giving \"I'm being gaslit\" energy. You're fine, they're the problem.",
            "You're literally just existing and being reasonable. If someone has an issue with that, that's a them problem.",
            "You stood up for what's right and someone is mad? Good. They should be mad. You're absolutely NTA.",
            "You protected someone or yourself? That's not asshole behavior, that's being a decent person. NTA all the way.",
        ],
    },
    Tier {
        name: "honest_mistake",
        when: any_of![
            has!("misunderstanding"),
            has!("accident"),
            has!("didn't mean to"),
            has!("unintentional"),
            has!("honest mistake"),
            has!("genuine mistake"),
            has!("miscommunication"),
            has!("misheard"),
            has!("misunderstood"),
            has!("wasn't aware"),
            has!("didn't know"),
            has!("wasn't informed"),
            all_of![has!("forgot"), Clause::Not(&has!("on purpose"))],
        ],
        verdict: Verdict::NotAsshole,
        score: 3,
        responses: &[
            "This sounds like a classic case of \"oops, my bad\" and honestly? Accidents happen. You're good.",
            "You didn't mean to cause drama and it shows. This is just life being messy, not you being an asshole.",
            "This is giving \"I made a mistake but I'm human\" vibes. We all mess up sometimes, you're fine.",
            "Honestly? This seems like a genuine mistake. Unless you're secretly a supervillain, you're probably fine.",
            "You made an honest mistake and you're being reasonable about it? That's not asshole behavior, that's being human.",
            "This is just a misunderstanding. You're fine, don't stress about it.",
        ],
    },
    Tier {
        name: "ambiguous",
        when: Clause::Always,
        verdict: Verdict::NotAsshole,
        score: 5,
        responses: &[
            "This is giving \"I have no idea what's happening but I'm trying my best\" energy. You're probably fine?",
            "The situation is messy but you seem reasonable enough. Could go either way honestly.",
            "This is peak \"life is complicated\" content. You're probably not the asshole, but who knows anymore?",
            "Honestly? This is giving neutral vibes. You're probably fine, but maybe think about it a bit more.",
        ],
    },
];

// =============================================================================
// Classification
// =============================================================================

/// First tier whose predicate holds on the lower-cased context.
pub fn match_tier(context: &str) -> &'static Tier {
    let lowered = context.to_lowercase();
    TIERS
        .iter()
        .find(|tier| tier.when.matches(&lowered))
        .unwrap_or(&TIERS[TIERS.len() - 1])
}

/// Classify an already merged context string.
pub fn classify_context<R: Rng + ?Sized>(context: &str, rng: &mut R) -> JudgmentResult {
    let tier = match_tier(context);
    debug!(tier = tier.name, score = tier.score, "rule tier matched");
    tier.judge(rng)
}

/// Classify a situation plus optional follow-up context.
pub fn classify<R: Rng + ?Sized>(
    situation: &str,
    follow_up: Option<&str>,
    rng: &mut R,
) -> JudgmentResult {
    classify_context(&combine_context(situation, follow_up), rng)
}
