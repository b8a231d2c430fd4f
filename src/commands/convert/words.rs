pub fn group_words(line: &str) -> Vec<String> {
    let mut groups = Vec::<String>::new();
    let mut current = String::new();
    let mut gap = 0usize;

    for ch in line.chars() {
        if ch.is_whitespace() {
            gap += if ch == '\t' { 2 } else { 1 };
            continue;
        }

        if !current.is_empty() {
            if gap >= 2 {
                groups.push(std::mem::take(&mut current));
            } else if gap == 1 {
                current.push(' ');
            }
        }
        gap = 0;
        current.push(ch);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

pub fn normalize_title(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|ch| ch.is_whitespace()).count()
}

pub fn narrowest_inner_gap(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    let mut narrowest: Option<usize> = None;
    let mut gap = 0usize;

    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            gap += 1;
            continue;
        }
        if gap >= 2 {
            narrowest = Some(narrowest.map_or(gap, |value| value.min(gap)));
        }
        gap = 0;
    }

    narrowest
}
