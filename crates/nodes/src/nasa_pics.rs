//! NASA Pics: a declarative node over the public NASA open-data API.
//!
//! Two resources, each with a single `get` operation:
//!
//! - `astronomyPictureOfTheDay` → `GET /planetary/apod[?date=YYYY-MM-DD]`
//! - `marsRoverPhotos` → `GET /mars-photos/api/v1/rovers/{roverName}/photos?earth_date=YYYY-MM-DD`

use node_core::{
    inject, CredentialRequirement, CredentialSource, DeclarativeNode, FieldDefinition,
    FieldOption, FieldPath, FieldSchema, FieldValues, NodeError, NodeTypeDescription,
    RequestDefaults, RequestDescriptor, RequestTemplate, ResourceCatalog, Template,
    ValueTransform, OPERATION_FIELD, RESOURCE_FIELD,
};
use tracing::debug;

use crate::credentials::NASA_PICS_API;

pub const NODE_NAME: &str = "NasaPics";
pub const BASE_URL: &str = "https://api.nasa.gov";

pub const APOD: &str = "astronomyPictureOfTheDay";
pub const MARS_ROVER_PHOTOS: &str = "marsRoverPhotos";
pub const GET: &str = "get";

pub const ROVER_NAME: &str = "roverName";
pub const MARS_ROVER_DATE: &str = "marsRoverDate";
pub const ADDITIONAL_FIELDS: &str = "additionalFields";
pub const APOD_DATE: &str = "apodDate";

/// Rovers the photos endpoint knows about.
pub const ROVERS: [&str; 4] = ["curiosity", "opportunity", "perseverance", "spirit"];

fn properties() -> FieldSchema {
    FieldSchema::new(vec![
        FieldDefinition::options(
            RESOURCE_FIELD,
            "Resource",
            vec![
                FieldOption::new("Astronomy Picture of the Day", APOD),
                FieldOption::new("Mars Rover Photos", MARS_ROVER_PHOTOS),
            ],
            APOD,
        ),
        FieldDefinition::options(OPERATION_FIELD, "Operation", vec![FieldOption::new("Get", GET)], GET),
        FieldDefinition::options(
            ROVER_NAME,
            "Rover name",
            ROVERS
                .iter()
                .map(|rover| FieldOption::new(capitalise(rover), *rover))
                .collect(),
            "curiosity",
        )
        .required()
        .described("Choose which Mars Rover to get a photo from")
        .shown_when(RESOURCE_FIELD, &[MARS_ROVER_PHOTOS]),
        FieldDefinition::date_time(MARS_ROVER_DATE, "Date")
            .required()
            .described("Earth date")
            .shown_when(RESOURCE_FIELD, &[MARS_ROVER_PHOTOS]),
        FieldDefinition::collection(
            ADDITIONAL_FIELDS,
            "Additional Fields",
            vec![FieldDefinition::date_time(APOD_DATE, "Date")],
        )
        .with_placeholder("Add Field")
        .shown_when(RESOURCE_FIELD, &[APOD])
        .shown_when(OPERATION_FIELD, &[GET]),
    ])
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn catalog() -> ResourceCatalog {
    ResourceCatalog::new()
        .with_operation(
            APOD,
            GET,
            RequestTemplate::get("/planetary/apod", "Get the APOD")
                .described("Get the Astronomy Picture of the day")
                .with_query(
                    "date",
                    FieldPath::nested(ADDITIONAL_FIELDS, APOD_DATE),
                    ValueTransform::UtcDate,
                ),
        )
        .with_operation(
            MARS_ROVER_PHOTOS,
            GET,
            RequestTemplate::get("/mars-photos/api/v1/rovers/{roverName}/photos", "Get Mars Rover photos")
                .described("Get photos from the Mars Rover")
                .with_query(
                    "earth_date",
                    FieldPath::top(MARS_ROVER_DATE),
                    ValueTransform::UtcDate,
                ),
        )
}

/// Node type description as registered with the host.
pub fn description() -> NodeTypeDescription {
    let mut description = NodeTypeDescription::transform(
        NODE_NAME,
        "NASA Pics",
        "Get data from NASAs API",
        properties(),
    );
    description.icon = Some("file:docsify.svg".to_owned());
    description.subtitle = Some(Template::new("{operation}: {resource}"));
    description.credentials = vec![CredentialRequirement {
        name: crate::credentials::description().name,
        required: true,
    }];
    description.request_defaults = Some(RequestDefaults::json_api(BASE_URL));
    description
}

/// The NASA Pics node.
#[derive(Debug, Clone)]
pub struct NasaPics {
    node: DeclarativeNode,
}

impl NasaPics {
    pub fn new() -> Result<Self, NodeError> {
        Ok(Self {
            node: DeclarativeNode::new(description(), catalog())?,
        })
    }

    pub fn description(&self) -> &NodeTypeDescription {
        self.node.description()
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        self.node.catalog()
    }

    /// Builds the unauthenticated request for `resource`/`operation`.
    pub fn resolve(
        &self,
        resource: &str,
        operation: &str,
        values: &FieldValues,
    ) -> Result<RequestDescriptor, NodeError> {
        self.node.resolve(resource, operation, values)
    }

    /// Builds the request and attaches the credential from `credentials`.
    pub fn build_request(
        &self,
        resource: &str,
        operation: &str,
        values: &FieldValues,
        credentials: &dyn CredentialSource,
    ) -> Result<RequestDescriptor, NodeError> {
        let request = self.resolve(resource, operation, values)?;
        let credential = credentials.get_credential()?;
        debug!(credential = NASA_PICS_API, "injecting credential");
        Ok(inject(&request, &credential))
    }
}
