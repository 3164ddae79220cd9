//! Selector registry for the support widget.
//!
//! Every CSS pattern the page object uses lives here. Child selectors are
//! derived from their parents with `concat!`, so editing a parent literal
//! propagates to everything built on it.

macro_rules! article_popular_title {
    () => {
        "[class^=popularTitle__]"
    };
}

macro_rules! article_popular_list {
    () => {
        concat!(article_popular_title!(), " + ul[class^=articles__]")
    };
}

macro_rules! article_view {
    () => {
        "[class^=article__]"
    };
}

/// Widget wrapper; most widget locators are scoped inside it
pub const WIDGET_WRAPPER: &str = ".sc-dino-typography-h > [class^=widget__]";

/// Root content container of the opened widget (page scoped)
pub const WIDGET_BODY: &str = "[class^=widgetWrapper] > [class^=widget__]";

/// Header text of the current widget view
pub const HEADER_TEXT: &str = "header h5";

/// Control that opens the widget
pub const BUTTON_OPEN: &str = "[data-test=openWidget]";

/// "Write to us" control that opens the contact form
pub const BUTTON_WRITE_TO_US: &str = "[class^=btn]";

/// Header control returning from an article to the list
pub const BUTTON_BACK: &str = "header button";

/// Heading above the popular articles list
pub const ARTICLE_POPULAR_TITLE: &str = article_popular_title!();

/// Popular articles list, the sibling right after its heading
pub const ARTICLE_POPULAR_LIST: &str = article_popular_list!();

/// One item of the popular articles list
pub const ARTICLE_POPULAR_LIST_ITEM: &str = concat!(article_popular_list!(), " > li");

/// Article detail view
pub const ARTICLE_VIEW: &str = article_view!();

/// Content pane of the article detail view
pub const ARTICLE_CONTENT: &str = concat!(article_view!(), " [class^=content__]");

/// Title of the article detail view
pub const ARTICLE_TITLE: &str = concat!(article_view!(), " [class^=title__]");

/// Cookie consent accept button (page scoped)
pub const COOKIE_BUTTON: &str = "._UCHI_COOKIE__button";

/// All registered selectors with their names, for listing and validation
pub const ALL: &[(&str, &str)] = &[
    ("WIDGET_WRAPPER", WIDGET_WRAPPER),
    ("WIDGET_BODY", WIDGET_BODY),
    ("HEADER_TEXT", HEADER_TEXT),
    ("BUTTON_OPEN", BUTTON_OPEN),
    ("BUTTON_WRITE_TO_US", BUTTON_WRITE_TO_US),
    ("BUTTON_BACK", BUTTON_BACK),
    ("ARTICLE_POPULAR_TITLE", ARTICLE_POPULAR_TITLE),
    ("ARTICLE_POPULAR_LIST", ARTICLE_POPULAR_LIST),
    ("ARTICLE_POPULAR_LIST_ITEM", ARTICLE_POPULAR_LIST_ITEM),
    ("ARTICLE_VIEW", ARTICLE_VIEW),
    ("ARTICLE_CONTENT", ARTICLE_CONTENT),
    ("ARTICLE_TITLE", ARTICLE_TITLE),
    ("COOKIE_BUTTON", COOKIE_BUTTON),
];

/// Cheap structural check that a CSS selector is well formed: non-empty,
/// balanced brackets and parentheses, and no dangling combinator.
#[must_use]
pub fn is_well_formed(css: &str) -> bool {
    let trimmed = css.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut brackets = 0i32;
    let mut parens = 0i32;
    for ch in trimmed.chars() {
        match ch {
            '[' => brackets += 1,
            ']' => brackets -= 1,
            '(' => parens += 1,
            ')' => parens -= 1,
            _ => {}
        }
        if brackets < 0 || parens < 0 {
            return false;
        }
    }
    let dangling = trimmed.ends_with(['>', '+', '~', ',']);
    brackets == 0 && parens == 0 && !dangling
}
