use super::super::answers::AnswerSet;
use super::super::catalog::QuestionInfo;

/// Theoretical maximum of the hazard x exposure x vulnerability product (3 x 3 x 3).
pub(crate) const MAX_RISK_RATING: f64 = 27.0;

/// Sum of `answer x weight` over the given items; unanswered items contribute 0.
pub(crate) fn weighted_sum<'a>(
    questions: impl IntoIterator<Item = &'a QuestionInfo>,
    answers: &AnswerSet,
) -> u32 {
    questions
        .into_iter()
        .map(|question| {
            let value = answers
                .get(question.code)
                .map(|answer| u32::from(answer.get()))
                .unwrap_or(0);
            value * u32::from(question.weight)
        })
        .sum()
}

/// Weighted mean of the answers over the given items, 0 when the items carry no weight.
pub(crate) fn weighted_average<'a>(
    questions: impl IntoIterator<Item = &'a QuestionInfo> + Clone,
    answers: &AnswerSet,
) -> f64 {
    let total_weight: u32 = questions
        .clone()
        .into_iter()
        .map(|question| u32::from(question.weight))
        .sum();
    if total_weight == 0 {
        return 0.0;
    }

    f64::from(weighted_sum(questions, answers)) / f64::from(total_weight)
}

/// Product of the three group averages scaled onto 0..=10.
pub(crate) fn composite_index(hazard: f64, exposure: f64, vulnerability: f64) -> (f64, f64) {
    let rating = hazard * exposure * vulnerability;
    (rating, rating / MAX_RISK_RATING * 10.0)
}
