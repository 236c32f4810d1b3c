// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Text layout for recommendation bodies.

mod text;

pub use text::{max_line_count, split_into_lines};
