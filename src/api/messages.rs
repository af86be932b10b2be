use chrono::NaiveDate;

pub fn message_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}")
}

pub fn list_endpoint() -> &'static str {
    "/gmail/v1/users/me/messages"
}

/// Shape of the per-message response requested from `messages.get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageFormat {
    Metadata { headers: Vec<String> },
    Full,
}

impl MessageFormat {
    pub fn metadata<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Metadata {
            headers: headers.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn get_query(format: &MessageFormat) -> Vec<(String, String)> {
    match format {
        MessageFormat::Metadata { headers } => {
            let mut query = vec![("format".to_string(), "metadata".to_string())];
            for header in headers {
                query.push(("metadataHeaders".to_string(), header.clone()));
            }
            query
        }
        MessageFormat::Full => vec![("format".to_string(), "full".to_string())],
    }
}

pub fn list_query(
    max_results: u32,
    query: Option<&str>,
    page_token: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = vec![("maxResults".to_string(), max_results.to_string())];
    if let Some(query) = query {
        params.push(("q".to_string(), query.to_string()));
    }
    if let Some(token) = page_token {
        params.push(("pageToken".to_string(), token.to_string()));
    }
    params
}

/// Search expression for messages received on or after `start` and before
/// `end`, in the `YYYY/MM/DD` form the search syntax expects.
pub fn date_range_query(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "after:{} before:{}",
        start.format("%Y/%m/%d"),
        end.format("%Y/%m/%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_date_range_query() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).expect("date");
        assert_eq!(
            date_range_query(start, end),
            "after:2024/01/01 before:2024/02/01"
        );
    }

    #[test]
    fn metadata_query_repeats_header_param() {
        let query = get_query(&MessageFormat::metadata(["From", "Subject"]));
        assert_eq!(
            query,
            vec![
                ("format".to_string(), "metadata".to_string()),
                ("metadataHeaders".to_string(), "From".to_string()),
                ("metadataHeaders".to_string(), "Subject".to_string()),
            ]
        );
    }

    #[test]
    fn list_query_carries_page_token() {
        let query = list_query(500, Some("in:inbox"), Some("next-1"));
        assert!(query.contains(&("maxResults".to_string(), "500".to_string())));
        assert!(query.contains(&("q".to_string(), "in:inbox".to_string())));
        assert!(query.contains(&("pageToken".to_string(), "next-1".to_string())));
    }
}
