use ratatui::widgets::ListState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub is_current: bool,
    pub is_remote: bool,
    pub upstream: Option<String>,
    pub track: Option<String>,
}

/// What the picked branch will be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickerPurpose {
    Switch,
    CompareBase,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchListItem {
    Header(String),
    Branch { idx: usize },
}

/// Fuzzy-filtered branch list shown in the branch modals.
#[derive(Clone, Debug)]
pub struct BranchPicker {
    pub purpose: PickerPurpose,
    pub query: String,
    pub branches: Vec<BranchEntry>,
    pub items: Vec<BranchListItem>,
    pub list_state: ListState,
}

fn fuzzy_score(haystack: &str, needle: &str) -> Option<i32> {
    let n = needle.trim();
    if n.is_empty() {
        return Some(0);
    }

    let mut score: i32 = 0;
    let mut last_match: Option<usize> = None;
    let mut pos = 0usize;

    for ch in n.chars() {
        let idx = haystack[pos..].char_indices().find(|(_, hc)| *hc == ch).map(|(i, _)| pos + i)?;

        score += 10;
        match last_match {
            Some(prev) if idx == prev + 1 => score += 15,
            Some(_) => {}
            None => score += (30 - idx as i32).max(0),
        }

        last_match = Some(idx);
        pos = idx + ch.len_utf8();
    }

    Some(score)
}

impl BranchPicker {
    pub fn new(purpose: PickerPurpose, branches: Vec<BranchEntry>) -> Self {
        let mut picker = Self {
            purpose,
            query: String::new(),
            branches,
            items: Vec::new(),
            list_state: ListState::default(),
        };
        picker.update_filtered();
        picker
    }

    pub fn push_query(&mut self, ch: char) {
        self.query.push(ch);
        self.update_filtered();
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.update_filtered();
    }

    pub fn update_filtered(&mut self) {
        let q = self.query.trim().to_lowercase();
        let prev_name = self.selected_branch().map(|b| b.name.clone());

        let mut matches: Vec<(i32, usize)> = self
            .branches
            .iter()
            .enumerate()
            .filter(|(_, b)| self.purpose != PickerPurpose::Switch || !b.is_current)
            .filter_map(|(i, b)| fuzzy_score(&b.name.to_lowercase(), &q).map(|s| (s, i)))
            .collect();

        // Best score first; ties keep the order git listed them in.
        matches.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let (locals, remotes): (Vec<usize>, Vec<usize>) = matches
            .into_iter()
            .map(|(_, i)| i)
            .partition(|i| !self.branches[*i].is_remote);

        self.items.clear();
        if !locals.is_empty() {
            self.items.push(BranchListItem::Header("Local".to_string()));
            self.items.extend(locals.into_iter().map(|idx| BranchListItem::Branch { idx }));
        }
        if !remotes.is_empty() {
            self.items.push(BranchListItem::Header("Remote".to_string()));
            self.items.extend(remotes.into_iter().map(|idx| BranchListItem::Branch { idx }));
        }

        let desired = prev_name
            .and_then(|name| {
                self.items.iter().position(|item| {
                    matches!(item, BranchListItem::Branch { idx } if self.branches[*idx].name == name)
                })
            })
            .or_else(|| {
                self.items
                    .iter()
                    .position(|i| matches!(i, BranchListItem::Branch { .. }))
            });
        self.list_state.select(desired);
    }

    pub fn selected_branch(&self) -> Option<&BranchEntry> {
        let sel = self.list_state.selected()?;
        match self.items.get(sel)? {
            BranchListItem::Branch { idx } => self.branches.get(*idx),
            BranchListItem::Header(_) => None,
        }
    }

    /// Moves to the next branch row in the direction of `delta`, skipping headers.
    pub fn move_selection(&mut self, delta: i32) {
        if self.items.is_empty() {
            self.list_state.select(None);
            return;
        }

        let last = self.items.len() as i32 - 1;
        let cur = self.list_state.selected().unwrap_or(0) as i32;
        let step = if delta >= 0 { 1 } else { -1 };
        let mut next = (cur + delta).clamp(0, last);

        while matches!(self.items.get(next as usize), Some(BranchListItem::Header(_))) {
            let candidate = next + step;
            if !(0..=last).contains(&candidate) {
                // Nothing selectable that way; stay put.
                next = cur;
                break;
            }
            next = candidate;
        }

        self.list_state.select(Some(next as usize));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(name: &str, is_current: bool, is_remote: bool) -> BranchEntry {
        BranchEntry {
            name: name.to_string(),
            is_current,
            is_remote,
            upstream: None,
            track: None,
        }
    }

    fn sample() -> Vec<BranchEntry> {
        vec![
            branch("main", true, false),
            branch("feature/wrap", false, false),
            branch("fix-queue", false, false),
            branch("origin/main", false, true),
        ]
    }

    #[test]
    fn switch_picker_hides_current_branch() {
        let picker = BranchPicker::new(PickerPurpose::Switch, sample());
        assert!(picker.items.iter().all(|i| !matches!(i, BranchListItem::Branch { idx: 0 })));
        assert_eq!(picker.selected_branch().map(|b| b.name.as_str()), Some("feature/wrap"));
    }

    #[test]
    fn base_picker_lists_every_branch() {
        let picker = BranchPicker::new(PickerPurpose::CompareBase, sample());
        let count = picker
            .items
            .iter()
            .filter(|i| matches!(i, BranchListItem::Branch { .. }))
            .count();
        assert_eq!(count, 4);
    }

    #[test]
    fn query_filters_fuzzily() {
        let mut picker = BranchPicker::new(PickerPurpose::CompareBase, sample());
        for ch in "fq".chars() {
            picker.push_query(ch);
        }
        assert_eq!(picker.selected_branch().map(|b| b.name.as_str()), Some("fix-queue"));
        picker.pop_query();
        picker.pop_query();
        assert_eq!(picker.query, "");
    }

    #[test]
    fn selection_skips_headers() {
        let mut picker = BranchPicker::new(PickerPurpose::CompareBase, sample());
        // Local header, 3 locals, Remote header, 1 remote.
        picker.list_state.select(Some(3));
        picker.move_selection(1);
        assert_eq!(picker.list_state.selected(), Some(5));
        picker.move_selection(-1);
        assert_eq!(picker.list_state.selected(), Some(3));
        picker.list_state.select(Some(1));
        picker.move_selection(-1);
        assert_eq!(picker.list_state.selected(), Some(1));
    }
}
