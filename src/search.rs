use chrono::{DateTime, Utc};

use crate::types::{Domain, Image, Linode, LinodeType, NodeBalancer, Volume};

pub const LINODE_ICON: &str = "LinodeIcon";
pub const VOLUME_ICON: &str = "VolumeIcon";
pub const NODEBAL_ICON: &str = "NodebalIcon";
pub const DOMAIN_ICON: &str = "DomainIcon";

/// Maps a resource kind to its display icon key. Anything unrecognized
/// falls back to the linode icon.
pub fn icon_for_kind(kind: &str) -> &'static str {
    match kind {
        "linodes" => LINODE_ICON,
        "volumes" => VOLUME_ICON,
        "nodebalancers" => NODEBAL_ICON,
        "domains" => DOMAIN_ICON,
        "images" => VOLUME_ICON,
        _ => LINODE_ICON,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultData {
    pub tags: Vec<String>,
    pub description: String,
    pub icon: &'static str,
    pub path: String,
    pub search_text: String,
    pub created: Option<DateTime<Utc>>,
    pub region: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub label: String,
    pub value: String,
    pub data: SearchResultData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub linodes: Vec<SearchResult>,
    pub volumes: Vec<SearchResult>,
    pub nodebalancers: Vec<SearchResult>,
    pub domains: Vec<SearchResult>,
    pub images: Vec<SearchResult>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.linodes.is_empty()
            && self.volumes.is_empty()
            && self.nodebalancers.is_empty()
            && self.domains.is_empty()
            && self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.linodes.len()
            + self.volumes.len()
            + self.nodebalancers.len()
            + self.domains.len()
            + self.images.len()
    }
}

/// Tags whose lowercased form contains the lowercased query. Computed once
/// per resource and reused for the match decision.
pub fn matching_tags<'a>(tags: &'a [String], query: &str) -> Vec<&'a String> {
    let query = query.to_lowercase();
    tags.iter()
        .filter(|tag| tag.to_lowercase().contains(&query))
        .collect()
}

/// A resource matches when its label contains the query case-insensitively,
/// or any of its tags does. An empty query therefore matches everything.
pub fn filter_matched(query: &str, label: &str, tags: &[String]) -> bool {
    label.to_lowercase().contains(&query.to_lowercase()) || !matching_tags(tags, query).is_empty()
}

/// Resolves a plan type id against the type catalog.
pub fn display_type(type_id: Option<&str>, types: &[LinodeType]) -> String {
    let Some(type_id) = type_id else {
        return "No Plan".to_string();
    };
    types
        .iter()
        .find(|t| t.id == type_id)
        .map(|t| t.label.clone())
        .unwrap_or_else(|| "Unknown Plan".to_string())
}

pub fn type_label_long(label: &str, memory: u64, disk: u64, vcpus: u64) -> String {
    format!(
        "{}: {} CPU, {}G Storage, {}G RAM",
        label,
        vcpus,
        disk / 1024,
        memory / 1024
    )
}

/// Secondary display line for a linode. A dangling image reference resolves
/// to the literal "Unknown Image" rather than an error.
pub fn linode_description(
    type_label: &str,
    memory: u64,
    disk: u64,
    vcpus: u64,
    image_id: Option<&str>,
    images: &[Image],
) -> String {
    let image_label = image_id
        .and_then(|id| images.iter().find(|img| img.id == id))
        .map(|img| img.label.as_str())
        .unwrap_or("Unknown Image");
    format!(
        "{}, {}",
        image_label,
        type_label_long(type_label, memory, disk, vcpus)
    )
}

pub fn search_linodes(
    linodes: &[Linode],
    query: &str,
    types: &[LinodeType],
    images: &[Image],
) -> Vec<SearchResult> {
    linodes
        .iter()
        .filter(|linode| filter_matched(query, &linode.label, &linode.tags))
        .map(|linode| SearchResult {
            label: linode.label.clone(),
            value: linode.id.to_string(),
            data: SearchResultData {
                tags: linode.tags.clone(),
                description: linode_description(
                    &display_type(linode.type_id.as_deref(), types),
                    linode.specs.memory,
                    linode.specs.disk,
                    linode.specs.vcpus,
                    linode.image.as_deref(),
                    images,
                ),
                icon: LINODE_ICON,
                path: format!("/linodes/{}", linode.id),
                search_text: query.to_string(),
                created: linode.created,
                region: Some(linode.region.clone()),
                status: Some(linode.status.clone()),
            },
        })
        .collect()
}

pub fn search_volumes(volumes: &[Volume], query: &str) -> Vec<SearchResult> {
    volumes
        .iter()
        .filter(|volume| filter_matched(query, &volume.label, &volume.tags))
        .map(|volume| SearchResult {
            label: volume.label.clone(),
            value: volume.id.to_string(),
            data: SearchResultData {
                tags: volume.tags.clone(),
                description: format!("{} GiB", volume.size),
                icon: VOLUME_ICON,
                path: format!("/volumes/{}", volume.id),
                search_text: query.to_string(),
                created: volume.created,
                region: Some(volume.region.clone()),
                status: None,
            },
        })
        .collect()
}

pub fn search_nodebalancers(nodebalancers: &[NodeBalancer], query: &str) -> Vec<SearchResult> {
    nodebalancers
        .iter()
        .filter(|nodebal| filter_matched(query, &nodebal.label, &nodebal.tags))
        .map(|nodebal| SearchResult {
            label: nodebal.label.clone(),
            value: nodebal.id.to_string(),
            data: SearchResultData {
                tags: nodebal.tags.clone(),
                description: nodebal.hostname.clone(),
                icon: NODEBAL_ICON,
                path: format!("/nodebalancers/{}", nodebal.id),
                search_text: query.to_string(),
                created: nodebal.created,
                region: None,
                status: None,
            },
        })
        .collect()
}

pub fn search_domains(domains: &[Domain], query: &str) -> Vec<SearchResult> {
    domains
        .iter()
        .filter(|domain| filter_matched(query, &domain.domain, &domain.tags))
        .map(|domain| SearchResult {
            label: domain.domain.clone(),
            value: domain.id.to_string(),
            data: SearchResultData {
                tags: domain.tags.clone(),
                description: domain
                    .description
                    .clone()
                    .unwrap_or_else(|| domain.status.clone()),
                icon: DOMAIN_ICON,
                path: format!("/domains/{}", domain.id),
                search_text: query.to_string(),
                created: None,
                region: None,
                status: None,
            },
        })
        .collect()
}

/// Images are a special case: only private images are searchable, and only
/// by label, since images carry no tags.
pub fn search_images(images: &[Image], query: &str) -> Vec<SearchResult> {
    images
        .iter()
        .filter(|image| {
            !image.is_public && image.label.to_lowercase().contains(&query.to_lowercase())
        })
        .map(|image| SearchResult {
            label: image.label.clone(),
            value: image.id.clone(),
            data: SearchResultData {
                tags: Vec::new(),
                description: image.description.clone().unwrap_or_default(),
                icon: VOLUME_ICON,
                path: "/images".to_string(),
                search_text: query.to_string(),
                created: image.created,
                region: None,
                status: None,
            },
        })
        .collect()
}

/// Runs a query across every resource kind. Pure: filter order mirrors the
/// input order of each collection and there is no relevance re-ranking.
pub fn search_all(
    linodes: &[Linode],
    volumes: &[Volume],
    nodebalancers: &[NodeBalancer],
    domains: &[Domain],
    images: &[Image],
    query: &str,
    types: &[LinodeType],
) -> SearchResults {
    SearchResults {
        linodes: search_linodes(linodes, query, types, images),
        volumes: search_volumes(volumes, query),
        nodebalancers: search_nodebalancers(nodebalancers, query),
        domains: search_domains(domains, query),
        images: search_images(images, query),
    }
}
