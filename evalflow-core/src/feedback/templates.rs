//! Canned phrases used for simulated comments, corrections and follow-ups.

use super::types::Sentiment;

pub const POSITIVE_COMMENTS: &[&str] = &[
    "This was really helpful, thanks!",
    "Great answer, exactly what I needed.",
    "Clear and to the point.",
    "Thanks, that solved my problem.",
    "Very thorough explanation.",
];

pub const NEUTRAL_COMMENTS: &[&str] = &[
    "This is okay, but could be more detailed.",
    "Somewhat helpful.",
    "I got part of what I needed.",
    "The answer is fine but a bit generic.",
    "Thanks, I'll look into it further.",
];

pub const NEGATIVE_COMMENTS: &[&str] = &[
    "This didn't answer my question.",
    "The information seems incorrect.",
    "Too vague to be useful.",
    "This is confusing.",
    "Not what I was looking for.",
];

pub const CORRECTIONS: &[&str] = &[
    "Actually, I think the correct information is",
    "That's not quite right. It should be",
    "I believe there's an error here. The correct answer is",
    "Please double-check this. According to the manual,",
];

pub const FOLLOW_UPS: &[&str] = &[
    "Could you explain more about",
    "What about",
    "Can you also tell me",
    "I still need to know",
    "How does this apply to",
];

/// Comment phrases for a sentiment.
pub fn comments_for(sentiment: Sentiment) -> &'static [&'static str] {
    match sentiment {
        Sentiment::Positive => POSITIVE_COMMENTS,
        Sentiment::Neutral => NEUTRAL_COMMENTS,
        Sentiment::Negative => NEGATIVE_COMMENTS,
    }
}
