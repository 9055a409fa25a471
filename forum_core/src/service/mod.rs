use validator::ValidationErrors;

pub mod comments;
pub mod content;
pub mod posts;
pub mod votes;

/// Flattens field errors into one line, e.g. "title: Title length must be ...".
pub(crate) fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: invalid ({})", e.code),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
