use super::*;

#[derive(Debug)]
struct CompiledRule {
    description: String,
    stage: IrregularityStage,
    page: Option<usize>,
    pattern: Regex,
    replacement: String,
    hits: usize,
}

#[derive(Debug, Default)]
pub struct IrregularityRules {
    rules: Vec<CompiledRule>,
}

impl IrregularityRules {
    pub fn compile(irregularities: &[Irregularity]) -> Result<Self> {
        let rules = irregularities
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).with_context(|| {
                    format!(
                        "invalid pattern for irregularity '{}': {}",
                        rule.description, rule.pattern
                    )
                })?;
                Ok(CompiledRule {
                    description: rule.description.clone(),
                    stage: rule.stage,
                    page: rule.page,
                    pattern,
                    replacement: rule.replacement.clone(),
                    hits: 0,
                })
            })
            .collect::<Result<Vec<CompiledRule>>>()?;

        Ok(Self { rules })
    }

    pub fn apply_to_pages(&mut self, chunks: Vec<String>) -> Vec<String> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(page, chunk)| {
                self.rules
                    .iter_mut()
                    .filter(|rule| rule.stage == IrregularityStage::Page)
                    .fold(chunk, |chunk, rule| rule.apply(page, chunk))
            })
            .collect()
    }

    pub fn apply_to_elements(&mut self, page: usize, elements: Vec<Element>) -> Vec<Element> {
        let mut rules = self
            .rules
            .iter_mut()
            .filter(|rule| rule.stage == IrregularityStage::Element)
            .filter(|rule| rule.page.is_none_or(|only| only == page))
            .collect::<Vec<&mut CompiledRule>>();
        if rules.is_empty() {
            return elements;
        }

        elements
            .into_iter()
            .map(|element| {
                element.map_texts(|text| {
                    text.map_text(|value| {
                        let value = rules
                            .iter_mut()
                            .fold(value, |value, rule| rule.apply(page, value));
                        vec![Inline::Text(value)]
                    })
                })
            })
            .collect()
    }

    pub fn applied(&self) -> usize {
        self.rules.iter().map(|rule| rule.hits).sum()
    }

    pub fn report_unused(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| rule.hits == 0)
            .map(|rule| {
                warn!(
                    description = %rule.description,
                    pattern = %rule.pattern,
                    "irregularity rule never applied"
                );
                format!("irregularity rule never applied: {}", rule.description)
            })
            .collect()
    }
}

impl CompiledRule {
    fn apply(&mut self, page: usize, text: String) -> String {
        if self.page.is_some_and(|only| only != page) || !self.pattern.is_match(&text) {
            return text;
        }

        self.hits += 1;
        debug!(description = %self.description, page, "applied irregularity rule");
        self.pattern
            .replace_all(&text, self.replacement.as_str())
            .into_owned()
    }
}
