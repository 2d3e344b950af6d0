// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! The binary artifact `make_base` writes and `process_requests` reloads.

use crate::layout::MapFrame;
use crate::model::Collections;
use crate::objects::{RenderSettings, RouterSettings};
use crate::routing::GraphData;
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

const MAGIC: &[u8; 8] = b"TRATLAS\0";
const FORMAT_VERSION: u32 = 1;

/// Everything the artifact persists. Layout and graph construction are baked
/// in, so reloading re-derives nothing but the route table.
#[derive(Serialize, Deserialize, Debug)]
pub struct Dataset {
    pub collections: Collections,
    pub router_settings: RouterSettings,
    pub render_settings: RenderSettings,
    pub map_frame: MapFrame,
    pub graph: GraphData,
}

pub fn write<P: AsRef<Path>>(path: P, dataset: &Dataset) -> Result<()> {
    let path = path.as_ref();
    info!("writing the base to {:?}", path);
    let file = File::create(path)
        .with_context(|| format!("failed to create the artifact file {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC)?;
    bincode::serialize_into(&mut writer, &FORMAT_VERSION)?;
    bincode::serialize_into(&mut writer, dataset)?;
    Ok(())
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    info!("loading the base from {:?}", path);
    let file = File::open(path)
        .with_context(|| format!("failed to open the artifact file {:?}", path))?;
    let mut reader = BufReader::new(file);
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        bail!("{:?} is not a transit-atlas artifact", path);
    }
    let version: u32 = bincode::deserialize_from(&mut reader)?;
    if version != FORMAT_VERSION {
        bail!(
            "unsupported artifact version {} in {:?}, expected {}",
            version,
            path,
            FORMAT_VERSION
        );
    }
    bincode::deserialize_from(&mut reader)
        .with_context(|| format!("failed to decode the artifact {:?}", path))
}
