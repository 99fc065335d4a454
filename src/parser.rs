//! Response tree normalizer.
//!
//! Walks an arbitrarily nested Web API response, finds every playable item
//! (track, episode or chapter) and collects a flat, display-ready view of
//! each under a `parsed_items` key on the response. Items discovered inside
//! a list container (album, show or audiobook) carry a clone of that
//! container as their `album` field; items found outside any list are
//! appended afterwards, in document order, without a container reference.
//!
//! Pure functions over [`serde_json::Value`]; the input tree is never
//! mutated beyond the final `parsed_items` insertion.

use serde_json::{Map, Value};

const LIST_TYPES: [&str; 3] = ["album", "show", "audiobook"];
const ITEM_TYPES: [&str; 3] = ["track", "episode", "chapter"];

/// The injected key. Skipped by every traversal so normalizing an
/// already-normalized response re-derives the same content.
const PARSED_ITEMS_KEY: &str = "parsed_items";

fn type_of(value: &Value) -> Option<&str> {
    value.get("type")?.as_str()
}

fn is_list(value: &Value) -> bool {
    type_of(value).is_some_and(|t| LIST_TYPES.contains(&t))
}

fn is_item(value: &Value) -> bool {
    type_of(value).is_some_and(|t| ITEM_TYPES.contains(&t))
}

/// Pre-order collection of every list-type object in the tree.
fn find_lists<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if is_list(value) {
                out.push(value);
            }
            for (key, child) in map {
                if key != PARSED_ITEMS_KEY {
                    find_lists(child, out);
                }
            }
        }
        Value::Array(children) => {
            for child in children {
                find_lists(child, out);
            }
        }
        _ => {}
    }
}

/// Pre-order collection of every item-type object in the tree, the root
/// included when it is itself an item.
fn find_items<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if is_item(value) {
                out.push(value);
            }
            for (key, child) in map {
                if key != PARSED_ITEMS_KEY {
                    find_items(child, out);
                }
            }
        }
        Value::Array(children) => {
            for child in children {
                find_items(child, out);
            }
        }
        _ => {}
    }
}

fn subtree_has_item(value: &Value) -> bool {
    if is_item(value) {
        return true;
    }
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| key.as_str() != PARSED_ITEMS_KEY)
            .any(|(_, child)| subtree_has_item(child)),
        Value::Array(children) => children.iter().any(subtree_has_item),
        _ => false,
    }
}

/// Whether a list-type object has at least one item anywhere beneath it.
fn list_has_items(list: &Value) -> bool {
    match list {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| key.as_str() != PARSED_ITEMS_KEY)
            .any(|(_, child)| subtree_has_item(child)),
        _ => false,
    }
}

/// Builds a copy of the tree with every list subtree that contains items
/// removed, so those items are not counted a second time as "mixed".
/// Lists with nothing beneath them are kept; they contribute nothing
/// either way.
fn prune(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => {
            if is_list(value) && list_has_items(value) {
                return None;
            }
            let mut out = Map::new();
            for (key, child) in map {
                if key == PARSED_ITEMS_KEY {
                    continue;
                }
                if let Some(kept) = prune(child) {
                    out.insert(key.clone(), kept);
                }
            }
            Some(Value::Object(out))
        }
        Value::Array(children) => {
            Some(Value::Array(children.iter().filter_map(prune).collect()))
        }
        other => Some(other.clone()),
    }
}

fn artist_names(artists: &[Value]) -> Vec<String> {
    artists
        .iter()
        .filter_map(|artist| artist.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Mirrors each artist's external web link into a `url` field on the
/// artist object itself.
fn add_artist_urls(artists: &mut [Value]) {
    for artist in artists {
        let url = artist
            .get("external_urls")
            .and_then(|links| links.get("spotify"))
            .cloned();
        if let (Some(object), Some(url)) = (artist.as_object_mut(), url) {
            object.insert("url".to_string(), url);
        }
    }
}

/// Builds the enriched view of one playable item.
///
/// `list` is the containing list container when the item was discovered
/// inside one; it replaces whatever the raw item carried in its `album`
/// field. Every lookup is guarded: items without artists, images or
/// external links still produce a view.
fn parse_item(item: &Value, list: Option<&Value>) -> Option<Value> {
    let raw = item.as_object()?;
    let mut view = raw.clone();

    if let Some(list) = list {
        view.insert("album".to_string(), list.clone());
    }

    // The effective container: the merged list, or whatever album object
    // the item naturally carried.
    let album = view.get("album").cloned();
    let album_artists = album
        .as_ref()
        .and_then(|a| a.get("artists"))
        .and_then(Value::as_array);

    let authors: Option<Vec<String>> = match raw.get("artists").and_then(Value::as_array) {
        Some(own) => Some(artist_names(own)),
        None => match album_artists {
            Some(inherited) => Some(artist_names(inherited)),
            None => album
                .as_ref()
                .and_then(|a| a.get("publisher"))
                .and_then(Value::as_str)
                .map(|publisher| vec![publisher.to_string()]),
        },
    };

    let cover = raw
        .get("images")
        .and_then(Value::as_array)
        .or(album
            .as_ref()
            .and_then(|a| a.get("images"))
            .and_then(Value::as_array))
        .and_then(|images| images.first())
        .cloned();

    let source_url = raw
        .get("external_urls")
        .and_then(|links| links.get("spotify"))
        .cloned();

    let name = raw.get("name").and_then(Value::as_str).unwrap_or_default();
    let album_name = album
        .as_ref()
        .and_then(|a| a.get("name"))
        .and_then(Value::as_str);

    let mut title = name.to_string();
    let mut query_parts = vec![name.to_string()];
    if let Some(authors) = &authors {
        if !authors.is_empty() {
            title = format!("{} - {}", title, authors.join(", "));
            query_parts.push(authors.join(" "));
        }
    }
    if let Some(album_name) = album_name {
        title = format!("{} ({})", title, album_name);
        query_parts.push(album_name.to_string());
    }

    if let Some(authors) = authors {
        view.insert(
            "authors".to_string(),
            Value::Array(authors.into_iter().map(Value::String).collect()),
        );
    }
    if let Some(cover) = cover {
        view.insert("cover".to_string(), cover);
    }
    if let Some(url) = source_url {
        view.insert("url".to_string(), url);
    }
    view.insert("title".to_string(), Value::String(title));
    view.insert(
        "search_query".to_string(),
        Value::String(query_parts.join(" ")),
    );

    if let Some(artists) = view.get_mut("artists").and_then(Value::as_array_mut) {
        add_artist_urls(artists);
    }
    if let Some(artists) = view
        .get_mut("album")
        .and_then(|album| album.get_mut("artists"))
        .and_then(Value::as_array_mut)
    {
        add_artist_urls(artists);
    }

    Some(Value::Object(view))
}

/// Normalizes a response body.
///
/// Collects a view for every playable item in the tree and assigns the
/// flat sequence to `parsed_items` on the response object: first the
/// items belonging to discovered list containers (grouped by container,
/// in document order), then the remaining "mixed" items. The rest of
/// the response passes through unmodified. Items appearing under several
/// containers produce one view per container; no de-duplication happens.
pub fn parse_response(mut response: Value) -> Value {
    let mut views: Vec<Value> = Vec::new();

    {
        let mut lists = Vec::new();
        find_lists(&response, &mut lists);
        for list in &lists {
            let mut items = Vec::new();
            find_items(list, &mut items);
            for item in items {
                if let Some(view) = parse_item(item, Some(list)) {
                    views.push(view);
                }
            }
        }

        if let Some(pruned) = prune(&response) {
            let mut items = Vec::new();
            find_items(&pruned, &mut items);
            for item in items {
                if let Some(view) = parse_item(item, None) {
                    views.push(view);
                }
            }
        }
    }

    if let Some(map) = response.as_object_mut() {
        map.insert(PARSED_ITEMS_KEY.to_string(), Value::Array(views));
    }
    response
}
