use super::{Recap, Section};

const WEEK_FORMAT: &str = "%m-%d-%Y";

/// Escapes text for an HTML body or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

fn week_label(recap: &Recap) -> String {
    format!(
        "{} - {}",
        recap.week_start.format(WEEK_FORMAT),
        recap.week_end.format(WEEK_FORMAT)
    )
}

pub fn subject(recap: &Recap) -> String {
    format!("Your Spotify Weekly Recap ({})", week_label(recap))
}

pub fn render_plain(recap: &Recap) -> String {
    let mut text = format!(
        "Here is your weekly Spotify activity recap for {}!\n\n",
        week_label(recap)
    );
    text.push_str(&format!(
        "You spent a total of {:.2} hours listening to Spotify.\n",
        recap.total_hours
    ));
    match &recap.busiest_day {
        Some(busiest) => text.push_str(&format!(
            "You listened to the most songs on {}, with a total of {} songs played.\n",
            busiest.day, busiest.plays
        )),
        None => text.push_str("You didn't play any songs this week.\n"),
    }
    text.push_str("\nBelow are tables of your weekly listening activities.\n");
    text
}

fn render_section(html: &mut String, section: &Section) {
    html.push_str(&format!("<h4>{}</h4>\n", escape_html(section.caption)));
    html.push_str("<table>\n<thead>\n<tr>");
    for header in section.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &section.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
}

pub fn render_html(recap: &Recap) -> String {
    let mut html = String::from("<html>\n<body>\n");
    for section in &recap.sections {
        render_section(&mut html, section);
    }
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BusiestDay;
    use chrono::NaiveDate;

    fn recap() -> Recap {
        Recap {
            week_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            week_end: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            total_hours: 3.5,
            busiest_day: Some(BusiestDay {
                day: "2024-01-03".to_string(),
                plays: 42,
            }),
            sections: vec![
                Section {
                    caption: "Your most played songs were:",
                    headers: &["Song Name", "Times Played"],
                    rows: vec![vec!["Rock & <Roll>".to_string(), "3".to_string()]],
                },
                Section {
                    caption: "The most popular albums you listened to were:",
                    headers: &["Album Name"],
                    rows: vec![],
                },
            ],
        }
    }

    #[test]
    fn subject_spans_the_week() {
        assert_eq!(
            subject(&recap()),
            "Your Spotify Weekly Recap (01-01-2024 - 01-07-2024)"
        );
    }

    #[test]
    fn plain_text_summarizes_the_week() {
        let text = render_plain(&recap());
        assert!(text.starts_with("Here is your weekly Spotify activity recap for 01-01-2024 - 01-07-2024!"));
        assert!(text.contains("You spent a total of 3.50 hours listening to Spotify."));
        assert!(text.contains("on 2024-01-03, with a total of 42 songs played."));
    }

    #[test]
    fn plain_text_handles_silent_week() {
        let mut quiet = recap();
        quiet.busiest_day = None;
        quiet.total_hours = 0.0;

        let text = render_plain(&quiet);
        assert!(text.contains("0.00 hours"));
        assert!(text.contains("You didn't play any songs this week."));
    }

    #[test]
    fn html_has_captioned_escaped_tables_in_order() {
        let html = render_html(&recap());

        assert!(html.contains(
            "<h4>Your most played songs were:</h4>\n<table>\n<thead>\n\
             <tr><th>Song Name</th><th>Times Played</th></tr>"
        ));
        assert!(html.contains("<tr><td>Rock &amp; &lt;Roll&gt;</td><td>3</td></tr>"));
        assert!(!html.contains("<Roll>"));

        let first = html.find("Your most played songs").unwrap();
        let second = html.find("The most popular albums").unwrap();
        assert!(first < second);
        assert_eq!(html.matches("<table>").count(), 2);
    }

    #[test]
    fn escapes_quotes() {
        assert_eq!(escape_html(r#"a "b" 'c'"#), "a &quot;b&quot; &#x27;c&#x27;");
    }
}
