//! In-memory session backed by a simulated rich-text editor
//!
//! The simulated editor follows the behaviour the harness depends on in a real
//! ProseMirror instance:
//!
//! - typing `- `, `* `, `+ ` or `1. ` at the start of a paragraph turns it into
//!   a bullet or ordered list item (input rules fire on the keystroke)
//! - Enter splits the current block; Enter in an empty list item leaves the list
//! - list toggle commands convert the list around the caret, or wrap the
//!   current paragraph
//! - floating menus are only visible while text is selected
//!
//! Page elements can be made hidden, disabled, unreadable or removed to
//! exercise the resolver's and executor's failure handling.

use crate::error::Result;
use crate::query::{ElementHandle, ElementInfo, ElementQuery};
use crate::session::{stale, KeyChord, Modifier, Session};
use async_trait::async_trait;
use prosecheck_core::CheckError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifier of a page element added to a [`MemoryPage`]
pub type ElementId = usize;

/// Formatting command a toolbar control triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    ToggleOrderedList,
    ToggleBulletList,
}

/// What clicking a page element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    Inert,
    Command(EditorCommand),
    Navigate(String),
}

/// When a page element is rendered visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Always,
    Hidden,
    /// Only while the editor holds a non-empty selection
    WhileSelecting,
}

/// A non-editor element of the simulated page
#[derive(Debug, Clone)]
pub struct PageElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    visibility: Visibility,
    enabled: bool,
    /// Reading its attributes fails, like a detached node
    unreadable: bool,
    behavior: Behavior,
    parent: Option<ElementId>,
}

impl PageElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            visibility: Visibility::Always,
            enabled: true,
            unreadable: false,
            behavior: Behavior::Inert,
            parent: None,
        }
    }

    pub fn button(text: &str) -> Self {
        Self::new("button").text(text)
    }

    pub fn link(href: &str, text: &str) -> Self {
        Self::new("a")
            .attr("href", href)
            .text(text)
            .behavior(Behavior::Navigate(href.to_string()))
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn title(self, title: &str) -> Self {
        self.attr("title", title)
    }

    pub fn aria_label(self, label: &str) -> Self {
        self.attr("aria-label", label)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn command(self, command: EditorCommand) -> Self {
        self.behavior(Behavior::Command(command))
    }
}

/// Kind of a top-level editor block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    BulletItem,
    OrderedItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    kind: BlockKind,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    All,
    /// Characters `from..to` of one block
    Range { block: usize, from: usize, to: usize },
}

/// Editor document with a caret
#[derive(Debug, Clone)]
struct EditorModel {
    blocks: Vec<Block>,
    block: usize,
    offset: usize,
    selection: Option<Selection>,
}

impl EditorModel {
    fn empty() -> Self {
        Self {
            blocks: vec![Block {
                kind: BlockKind::Paragraph,
                text: String::new(),
            }],
            block: 0,
            offset: 0,
            selection: None,
        }
    }

    fn len_of(&self, block: usize) -> usize {
        self.blocks[block].text.chars().count()
    }

    fn has_selection(&self) -> bool {
        match self.selection {
            Some(Selection::All) => self.blocks.iter().any(|b| !b.text.is_empty()),
            Some(Selection::Range { from, to, .. }) => from < to,
            None => false,
        }
    }

    fn caret_to_end(&mut self) {
        self.block = self.blocks.len() - 1;
        self.offset = self.len_of(self.block);
        self.selection = None;
    }

    fn caret_to_block_start(&mut self, block: usize) {
        self.block = block.min(self.blocks.len() - 1);
        self.offset = 0;
        self.selection = None;
    }

    fn delete_selection(&mut self) -> bool {
        match self.selection.take() {
            Some(Selection::All) => {
                *self = Self::empty();
                true
            }
            Some(Selection::Range { block, from, to }) => {
                let text = &self.blocks[block].text;
                let (head, rest) = split_chars(text, from);
                let (_, tail) = split_chars(&rest, to - from);
                self.blocks[block].text = head + &tail;
                self.block = block;
                self.offset = from;
                true
            }
            None => false,
        }
    }

    fn insert_char(&mut self, c: char) {
        self.delete_selection();
        let (head, tail) = split_chars(&self.blocks[self.block].text, self.offset);
        self.blocks[self.block].text = format!("{}{}{}", head, c, tail);
        self.offset += 1;
        self.apply_input_rules();
    }

    /// Markdown-style list shortcuts at the start of a paragraph
    fn apply_input_rules(&mut self) {
        let block = &self.blocks[self.block];
        if block.kind != BlockKind::Paragraph {
            return;
        }
        let (before, after) = split_chars(&block.text, self.offset);
        let kind = if matches!(before.as_str(), "- " | "* " | "+ ") {
            BlockKind::BulletItem
        } else if is_ordered_marker(&before) {
            BlockKind::OrderedItem
        } else {
            return;
        };

        self.blocks[self.block] = Block { kind, text: after };
        self.offset = 0;
    }

    fn enter(&mut self) {
        self.delete_selection();
        let current = self.blocks[self.block].clone();

        if current.kind != BlockKind::Paragraph && current.text.is_empty() {
            self.blocks[self.block].kind = BlockKind::Paragraph;
            return;
        }

        let (head, tail) = split_chars(&current.text, self.offset);
        self.blocks[self.block].text = head;
        self.blocks.insert(
            self.block + 1,
            Block {
                kind: current.kind,
                text: tail,
            },
        );
        self.block += 1;
        self.offset = 0;
    }

    fn backspace(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.offset > 0 {
            let (head, tail) = split_chars(&self.blocks[self.block].text, self.offset);
            let mut head: Vec<char> = head.chars().collect();
            head.pop();
            self.blocks[self.block].text = head.into_iter().collect::<String>() + &tail;
            self.offset -= 1;
        } else if self.blocks[self.block].kind != BlockKind::Paragraph {
            self.blocks[self.block].kind = BlockKind::Paragraph;
        } else if self.block > 0 {
            let removed = self.blocks.remove(self.block);
            self.block -= 1;
            self.offset = self.len_of(self.block);
            self.blocks[self.block].text.push_str(&removed.text);
        }
    }

    fn select_all(&mut self) {
        self.selection = Some(Selection::All);
    }

    fn select_to_end(&mut self) {
        let to = self.len_of(self.block);
        self.selection = (self.offset < to).then_some(Selection::Range {
            block: self.block,
            from: self.offset,
            to,
        });
    }

    /// Blocks a list command applies to
    fn command_range(&self) -> std::ops::Range<usize> {
        if self.selection == Some(Selection::All) {
            return 0..self.blocks.len();
        }
        let kind = self.blocks[self.block].kind;
        if kind == BlockKind::Paragraph {
            return self.block..self.block + 1;
        }

        let mut start = self.block;
        while start > 0 && self.blocks[start - 1].kind == kind {
            start -= 1;
        }
        let mut end = self.block + 1;
        while end < self.blocks.len() && self.blocks[end].kind == kind {
            end += 1;
        }
        start..end
    }

    fn toggle_list(&mut self, kind: BlockKind) {
        let range = self.command_range();
        let already = self.blocks[range.clone()].iter().all(|b| b.kind == kind);
        let target = if already { BlockKind::Paragraph } else { kind };
        for block in &mut self.blocks[range] {
            block.kind = target;
        }
    }

    fn apply(&mut self, command: EditorCommand) {
        match command {
            EditorCommand::ToggleOrderedList => self.toggle_list(BlockKind::OrderedItem),
            EditorCommand::ToggleBulletList => self.toggle_list(BlockKind::BulletItem),
        }
    }
}

fn is_ordered_marker(prefix: &str) -> bool {
    prefix
        .strip_suffix(". ")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

/// Split at a character offset
fn split_chars(text: &str, offset: usize) -> (String, String) {
    let idx = text
        .char_indices()
        .nth(offset)
        .map_or(text.len(), |(i, _)| i);
    (text[..idx].to_string(), text[idx..].to_string())
}

/// Builder for the initial state of a [`MemorySession`]
#[derive(Debug, Clone)]
pub struct MemoryPage {
    elements: Vec<Option<PageElement>>,
    editor_class: Option<String>,
    editor_url: Option<String>,
    url: Option<String>,
}

impl MemoryPage {
    /// A page without an editor
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            editor_class: None,
            editor_url: None,
            url: None,
        }
    }

    /// A page with an empty editor whose root carries `root_class`
    pub fn with_editor(root_class: &str) -> Self {
        Self {
            editor_class: Some(root_class.to_string()),
            ..Self::new()
        }
    }

    /// Only render the editor once the current URL ends with `path`
    pub fn editor_at(mut self, path: &str) -> Self {
        self.editor_url = Some(path.to_string());
        self
    }

    pub fn add(&mut self, element: PageElement) -> ElementId {
        self.elements.push(Some(element));
        self.elements.len() - 1
    }

    pub fn add_child(&mut self, parent: ElementId, mut element: PageElement) -> ElementId {
        element.parent = Some(parent);
        self.add(element)
    }

    /// Editor with a fixed formatting toolbar and a floating selection menu
    pub fn rich_text_editor(root_class: &str) -> Self {
        let mut page = Self::with_editor(root_class);

        let toolbar = page.add(PageElement::new("div").class("toolbar"));
        page.add_child(toolbar, PageElement::button("B").title("Bold"));
        page.add_child(
            toolbar,
            PageElement::button("")
                .title("Bullet list")
                .aria_label("Bullet list")
                .command(EditorCommand::ToggleBulletList),
        );
        page.add_child(
            toolbar,
            PageElement::button("")
                .title("Ordered list")
                .aria_label("Ordered list")
                .command(EditorCommand::ToggleOrderedList),
        );

        let menu = page.add(
            PageElement::new("div")
                .class("floating-menu")
                .attr("role", "toolbar")
                .attr("data-floating", "true")
                .visibility(Visibility::WhileSelecting),
        );
        page.add_child(
            menu,
            PageElement::button("Bullet").command(EditorCommand::ToggleBulletList),
        );
        page.add_child(
            menu,
            PageElement::button("Numbered").command(EditorCommand::ToggleOrderedList),
        );

        page
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Page(ElementId),
    EditorRoot,
    List(usize),
    Block(usize),
}

#[derive(Debug, Clone)]
struct Node {
    info: ElementInfo,
    parent: Option<usize>,
    source: Source,
}

#[derive(Debug)]
struct PageState {
    page: MemoryPage,
    editor: EditorModel,
    focused: bool,
    disconnected: bool,
    screenshot_failure: bool,
    screenshots: usize,
    clicks: BTreeMap<ElementId, usize>,
}

impl PageState {
    fn check_connected(&self) -> Result<()> {
        if self.disconnected {
            Err(CheckError::Browser("session disconnected".to_string()))
        } else {
            Ok(())
        }
    }

    fn editor_present(&self) -> bool {
        self.page.editor_class.is_some()
            && self.page.editor_url.as_ref().map_or(true, |path| {
                self.page
                    .url
                    .as_ref()
                    .is_some_and(|url| url.ends_with(path.as_str()))
            })
    }

    /// Render the current page into a flat, document-ordered node list
    fn snapshot(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut node_of: BTreeMap<ElementId, usize> = BTreeMap::new();
        let selecting = self.editor_present() && self.focused && self.editor.has_selection();

        for (id, element) in self.page.elements.iter().enumerate() {
            let Some(element) = element else { continue };
            let parent = element.parent.and_then(|p| node_of.get(&p).copied());
            if element.parent.is_some() && parent.is_none() {
                // Parent removed: the subtree is gone too
                continue;
            }

            let own_visible = match element.visibility {
                Visibility::Always => true,
                Visibility::Hidden => false,
                Visibility::WhileSelecting => selecting,
            };
            let visible = own_visible && parent.map_or(true, |p| nodes[p].info.visible);

            node_of.insert(id, nodes.len());
            nodes.push(Node {
                info: ElementInfo {
                    tag: element.tag.clone(),
                    attributes: element.attributes.clone(),
                    text: element.text.clone(),
                    visible,
                    enabled: element.enabled,
                },
                parent,
                source: Source::Page(id),
            });
        }

        if let (true, Some(class)) = (self.editor_present(), &self.page.editor_class) {
            self.render_editor(class, &mut nodes);
        }

        // Container text includes descendant text, children always follow parents
        for i in (0..nodes.len()).rev() {
            if let Some(p) = nodes[i].parent {
                if matches!(nodes[p].source, Source::Page(_)) && !nodes[i].info.text.is_empty() {
                    let child_text = nodes[i].info.text.clone();
                    let parent_text = &mut nodes[p].info.text;
                    *parent_text = if parent_text.is_empty() {
                        child_text
                    } else {
                        format!("{} {}", child_text, parent_text)
                    };
                }
            }
        }

        nodes
    }

    fn render_editor(&self, class: &str, nodes: &mut Vec<Node>) {
        let root = nodes.len();
        let mut attributes = BTreeMap::new();
        attributes.insert("class".to_string(), class.to_string());
        attributes.insert("contenteditable".to_string(), "true".to_string());
        attributes.insert("role".to_string(), "textbox".to_string());
        let all_text: Vec<&str> = self.editor.blocks.iter().map(|b| b.text.as_str()).collect();
        nodes.push(Node {
            info: ElementInfo {
                tag: "div".to_string(),
                attributes,
                text: all_text.join("\n"),
                visible: true,
                enabled: true,
            },
            parent: None,
            source: Source::EditorRoot,
        });

        let mut current_list: Option<(BlockKind, usize)> = None;
        for (i, block) in self.editor.blocks.iter().enumerate() {
            let tag = match block.kind {
                BlockKind::Paragraph => {
                    current_list = None;
                    nodes.push(editor_node("p", &block.text, Some(root), Source::Block(i)));
                    continue;
                }
                BlockKind::BulletItem => "ul",
                BlockKind::OrderedItem => "ol",
            };

            let list = match current_list {
                Some((kind, list)) if kind == block.kind => list,
                _ => {
                    nodes.push(editor_node(tag, "", Some(root), Source::List(i)));
                    let list = nodes.len() - 1;
                    current_list = Some((block.kind, list));
                    list
                }
            };
            nodes[list].info.text = if nodes[list].info.text.is_empty() {
                block.text.clone()
            } else {
                format!("{}\n{}", nodes[list].info.text, block.text)
            };
            nodes.push(editor_node("li", &block.text, Some(list), Source::Block(i)));
        }
    }

    fn matches(nodes: &[Node], index: usize, query: &ElementQuery) -> bool {
        if !query.matches_element(&nodes[index].info) {
            return false;
        }
        match &query.within {
            None => true,
            Some(ancestor) => {
                let mut current = nodes[index].parent;
                while let Some(p) = current {
                    if Self::matches(nodes, p, ancestor) {
                        return true;
                    }
                    current = nodes[p].parent;
                }
                false
            }
        }
    }

    fn is_descendant(nodes: &[Node], index: usize, ancestor: usize) -> bool {
        let mut current = nodes[index].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = nodes[p].parent;
        }
        false
    }

    fn matching(nodes: &[Node], scope: Option<usize>, query: &ElementQuery) -> Vec<usize> {
        (0..nodes.len())
            .filter(|&i| scope.map_or(true, |s| Self::is_descendant(nodes, i, s)))
            .filter(|&i| Self::matches(nodes, i, query))
            .collect()
    }

    fn resolve(nodes: &[Node], handle: &ElementHandle) -> Option<usize> {
        let mut current = None;
        for step in handle.steps() {
            current = Some(*Self::matching(nodes, current, &step.query).get(step.index)?);
        }
        current
    }

    fn serialize(nodes: &[Node], index: usize) -> String {
        let children: Vec<usize> = (0..nodes.len())
            .filter(|&i| nodes[i].parent == Some(index))
            .collect();
        if children.is_empty() {
            return nodes[index].info.text.clone();
        }
        children
            .into_iter()
            .map(|c| {
                let info = &nodes[c].info;
                format!("<{}>{}</{}>", info.tag, Self::serialize(nodes, c), info.tag)
            })
            .collect()
    }
}

fn editor_node(tag: &str, text: &str, parent: Option<usize>, source: Source) -> Node {
    Node {
        info: ElementInfo {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            text: text.to_string(),
            visible: true,
            enabled: true,
        },
        parent,
        source,
    }
}

/// Session over a simulated page and editor
#[derive(Debug)]
pub struct MemorySession {
    state: Mutex<PageState>,
}

impl MemorySession {
    pub fn new(page: MemoryPage) -> Self {
        Self {
            state: Mutex::new(PageState {
                page,
                editor: EditorModel::empty(),
                focused: false,
                disconnected: false,
                screenshot_failure: false,
                screenshots: 0,
                clicks: BTreeMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a page element and its subtree
    pub fn remove(&self, id: ElementId) {
        if let Some(slot) = self.state().page.elements.get_mut(id) {
            *slot = None;
        }
    }

    pub fn set_visibility(&self, id: ElementId, visibility: Visibility) {
        if let Some(Some(element)) = self.state().page.elements.get_mut(id) {
            element.visibility = visibility;
        }
    }

    pub fn set_enabled(&self, id: ElementId, enabled: bool) {
        if let Some(Some(element)) = self.state().page.elements.get_mut(id) {
            element.enabled = enabled;
        }
    }

    /// Every following call fails like a dropped DevTools connection
    pub fn disconnect(&self) {
        self.state().disconnected = true;
    }

    pub fn fail_screenshots(&self, fail: bool) {
        self.state().screenshot_failure = fail;
    }

    pub fn screenshots_taken(&self) -> usize {
        self.state().screenshots
    }

    pub fn click_count(&self, id: ElementId) -> usize {
        self.state().clicks.get(&id).copied().unwrap_or(0)
    }

    pub fn current_url(&self) -> Option<String> {
        self.state().page.url.clone()
    }

    pub fn is_focused(&self) -> bool {
        self.state().focused
    }

    /// Current editor blocks as `(kind, text)`
    pub fn blocks(&self) -> Vec<(BlockKind, String)> {
        self.state()
            .editor
            .blocks
            .iter()
            .map(|b| (b.kind, b.text.clone()))
            .collect()
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.check_connected()?;
        state.page.url = Some(url.to_string());
        state.focused = false;
        Ok(())
    }

    async fn query_all(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>> {
        let state = self.state();
        state.check_connected()?;
        let nodes = state.snapshot();
        let count = PageState::matching(&nodes, None, query).len();
        Ok((0..count)
            .map(|i| ElementHandle::root(query.clone(), i))
            .collect())
    }

    async fn query_within(
        &self,
        scope: &ElementHandle,
        query: &ElementQuery,
    ) -> Result<Vec<ElementHandle>> {
        let state = self.state();
        state.check_connected()?;
        let nodes = state.snapshot();
        let scope_node = PageState::resolve(&nodes, scope).ok_or_else(|| stale(scope))?;
        let count = PageState::matching(&nodes, Some(scope_node), query).len();
        Ok((0..count).map(|i| scope.child(query.clone(), i)).collect())
    }

    async fn describe(&self, handle: &ElementHandle) -> Result<ElementInfo> {
        let state = self.state();
        state.check_connected()?;
        let nodes = state.snapshot();
        let index = PageState::resolve(&nodes, handle).ok_or_else(|| stale(handle))?;

        if let Source::Page(id) = nodes[index].source {
            if state.page.elements[id].as_ref().is_some_and(|e| e.unreadable) {
                return Err(CheckError::StaleElement(format!(
                    "reading attributes of {} threw",
                    handle
                )));
            }
        }
        Ok(nodes[index].info.clone())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        let mut state = self.state();
        state.check_connected()?;
        let nodes = state.snapshot();
        let index = PageState::resolve(&nodes, handle).ok_or_else(|| stale(handle))?;
        let node = &nodes[index];

        if !node.info.visible {
            return Err(CheckError::Action(format!("{} is not visible", handle)));
        }

        match node.source {
            Source::Page(id) => {
                *state.clicks.entry(id).or_insert(0) += 1;
                let behavior = state.page.elements[id]
                    .as_ref()
                    .map(|e| e.behavior.clone())
                    .unwrap_or(Behavior::Inert);
                if !node.info.enabled {
                    return Ok(());
                }
                match behavior {
                    Behavior::Inert => {}
                    Behavior::Command(command) => {
                        if state.editor_present() {
                            state.editor.apply(command);
                        }
                    }
                    Behavior::Navigate(href) => {
                        state.page.url = Some(href);
                        state.focused = false;
                    }
                }
            }
            Source::EditorRoot => {
                state.focused = true;
                state.editor.caret_to_end();
            }
            Source::List(first_block) | Source::Block(first_block) => {
                state.focused = true;
                state.editor.caret_to_block_start(first_block);
            }
        }
        Ok(())
    }

    async fn select_option(&self, handle: &ElementHandle, value: &str) -> Result<()> {
        let mut state = self.state();
        state.check_connected()?;
        let nodes = state.snapshot();
        let index = PageState::resolve(&nodes, handle).ok_or_else(|| stale(handle))?;
        match nodes[index].source {
            Source::Page(id) if nodes[index].info.tag == "select" => {
                if let Some(element) = state.page.elements[id].as_mut() {
                    element.attributes.insert("value".to_string(), value.to_string());
                }
                Ok(())
            }
            _ => Err(CheckError::Action(format!("{} is not a select element", handle))),
        }
    }

    async fn press(&self, chord: &KeyChord) -> Result<()> {
        let mut state = self.state();
        state.check_connected()?;
        if !state.focused || !state.editor_present() {
            return Ok(());
        }

        let command = chord.has(Modifier::Control) || chord.has(Modifier::Meta);
        let editor = &mut state.editor;
        match chord.key.as_str() {
            "a" | "A" if command => editor.select_all(),
            "End" if chord.has(Modifier::Shift) => editor.select_to_end(),
            "End" => {
                editor.offset = editor.len_of(editor.block);
                editor.selection = None;
            }
            "Backspace" | "Delete" => editor.backspace(),
            "Enter" => editor.enter(),
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let mut state = self.state();
        state.check_connected()?;
        if !state.focused || !state.editor_present() {
            return Ok(());
        }
        for c in text.chars() {
            if c == '\n' {
                state.editor.enter();
            } else {
                state.editor.insert_char(c);
            }
        }
        Ok(())
    }

    async fn markup(&self, query: &ElementQuery) -> Result<Option<String>> {
        let state = self.state();
        state.check_connected()?;
        let nodes = state.snapshot();
        Ok(PageState::matching(&nodes, None, query)
            .first()
            .map(|&i| PageState::serialize(&nodes, i)))
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.check_connected()?;
        if state.screenshot_failure {
            return Err(CheckError::Capture("screenshot unavailable".to_string()));
        }
        state.screenshots += 1;
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(state.screenshots.to_string().as_bytes());
        Ok(data)
    }

    async fn close(&self) -> Result<()> {
        self.state().disconnected = true;
        Ok(())
    }
}
