/*!
# Coastal Monitoring Dashboard

A browser-based dashboard for water-quality monitoring data along a coastline,
with a predicted-toxicity lookup by CAS registry number, built in Rust.

## Overview

Two spreadsheets drive the application: a concentration sheet with one row per
sampling event (station, time, position and a set of numeric parameters) and a
toxicity sheet with one row per chemical. The server loads each once per
browser session, colors map markers by the selected parameter and answers
exact-match CAS lookups.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, JavaScript, Leaflet
- **Views**: home, concentration map, CAS lookup

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Spreadsheet Loader - reads xlsx/xls/ods/csv, normalizes headers,
    validates required columns
  - Range Calculator - per-parameter min/max
  - Marker Builder - one colored circle marker per record on a linear
    blue-to-red scale
  - Map View State - center/zoom per session with reset
  - Exact-Match Lookup - CAS identifier to toxicity profile
  - Session Store - one explicit context per browser session

## Modules

- **error**: error taxonomy shared by loaders and lookup
- **config**: JSON configuration with defaults
- **table**: cells, header normalization, column resolution
- **loader**: reading sheets from disk
- **monitoring**: monitoring records and the concentration table
- **ranges**: parameter range calculation
- **colormap**: linear color scale
- **markers**: marker construction
- **view**: map view state, map style, page
- **toxicity**: toxicity table and lookup
- **session**: per-session context and table cache
- **pipeline**: map and lookup pipelines over a session context
- **downloader**: source file downloads and marker export
- **app**: routing and handlers

## REST API Endpoints

- `/api/map` - markers, legend and tiles for the selected parameter
- `/api/view`, `/api/view/reset` - map view updates
- `/api/lookup?cas=` - exact-match toxicity lookup
- `/download/{artifact}` - source spreadsheets
- `/api/export` - rendered markers as CSV or XLSX
*/

pub mod colormap;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod markers;
pub mod monitoring;
pub mod pipeline;
pub mod ranges;
pub mod session;
pub mod table;
pub mod toxicity;
pub mod view;

#[cfg(feature = "web")]
pub mod app;

pub use error::{DashboardError, Result};
