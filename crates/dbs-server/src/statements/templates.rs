//! Built-in statement templates
//!
//! `{{owner}}` is the configured schema prefix. Other placeholders are filled
//! per call through [`StatementProvider::render`](super::StatementProvider::render).

pub(super) const BUILTIN: &[(&str, &str)] = &[
    // ------------------------------------------------------------------
    // Id reservation
    // ------------------------------------------------------------------
    ("ids.lock", "SELECT pg_advisory_xact_lock(hashtext($1))"),
    (
        "ids.max",
        "SELECT COALESCE(MAX({{id_column}}), 0) FROM {{owner}}{{table}}",
    ),
    ("ids.nextval", "SELECT nextval('{{owner}}{{sequence}}')"),
    // ------------------------------------------------------------------
    // Reference entities
    // ------------------------------------------------------------------
    (
        "primary_ds_types.get_id",
        "SELECT primary_ds_type_id FROM {{owner}}primary_ds_types WHERE primary_ds_type = $1",
    ),
    (
        "primary_ds_types.insert",
        "INSERT INTO {{owner}}primary_ds_types (primary_ds_type_id, primary_ds_type) VALUES ($1, $2)",
    ),
    (
        "primary_datasets.get_id",
        "SELECT primary_ds_id FROM {{owner}}primary_datasets WHERE primary_ds_name = $1",
    ),
    (
        "primary_datasets.insert",
        "INSERT INTO {{owner}}primary_datasets \
         (primary_ds_id, primary_ds_name, primary_ds_type_id, creation_date, create_by) \
         VALUES ($1, $2, $3, $4, $5)",
    ),
    (
        "processing_eras.get_id",
        "SELECT processing_era_id FROM {{owner}}processing_eras WHERE processing_version = $1",
    ),
    (
        "processing_eras.insert",
        "INSERT INTO {{owner}}processing_eras \
         (processing_era_id, processing_version, description, creation_date, create_by) \
         VALUES ($1, $2, $3, $4, $5)",
    ),
    (
        "acquisition_eras.get_id",
        "SELECT acquisition_era_id FROM {{owner}}acquisition_eras WHERE acquisition_era_name = $1",
    ),
    (
        "acquisition_eras.insert",
        "INSERT INTO {{owner}}acquisition_eras \
         (acquisition_era_id, acquisition_era_name, start_date, end_date, description, creation_date, create_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    ),
    (
        "data_tiers.get_id",
        "SELECT data_tier_id FROM {{owner}}data_tiers WHERE data_tier_name = $1",
    ),
    (
        "data_tiers.insert",
        "INSERT INTO {{owner}}data_tiers (data_tier_id, data_tier_name, creation_date, create_by) \
         VALUES ($1, $2, $3, $4)",
    ),
    (
        "physics_groups.get_id",
        "SELECT physics_group_id FROM {{owner}}physics_groups WHERE physics_group_name = $1",
    ),
    (
        "physics_groups.insert",
        "INSERT INTO {{owner}}physics_groups (physics_group_id, physics_group_name) VALUES ($1, $2)",
    ),
    (
        "dataset_access_types.get_id",
        "SELECT dataset_access_type_id FROM {{owner}}dataset_access_types WHERE dataset_access_type = $1",
    ),
    (
        "dataset_access_types.insert",
        "INSERT INTO {{owner}}dataset_access_types (dataset_access_type_id, dataset_access_type) \
         VALUES ($1, $2)",
    ),
    (
        "processed_datasets.get_id",
        "SELECT processed_ds_id FROM {{owner}}processed_datasets WHERE processed_ds_name = $1",
    ),
    (
        "processed_datasets.insert",
        "INSERT INTO {{owner}}processed_datasets (processed_ds_id, processed_ds_name) VALUES ($1, $2)",
    ),
    (
        "datasets.get_id",
        "SELECT dataset_id FROM {{owner}}datasets WHERE dataset = $1",
    ),
    (
        "datasets.insert",
        "INSERT INTO {{owner}}datasets \
         (dataset_id, dataset, is_dataset_valid, primary_ds_id, processed_ds_id, data_tier_id, \
          dataset_access_type_id, acquisition_era_id, processing_era_id, physics_group_id, \
          xtcrosssection, prep_id, creation_date, create_by, last_modification_date, last_modified_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    ),
    (
        "file_data_types.get_id",
        "SELECT file_type_id FROM {{owner}}file_data_types WHERE file_type = $1",
    ),
    (
        "file_data_types.insert",
        "INSERT INTO {{owner}}file_data_types (file_type_id, file_type) VALUES ($1, $2)",
    ),
    (
        "app_executables.get_id",
        "SELECT app_exec_id FROM {{owner}}app_executables WHERE app_name = $1",
    ),
    (
        "app_executables.insert",
        "INSERT INTO {{owner}}app_executables (app_exec_id, app_name) VALUES ($1, $2)",
    ),
    (
        "release_versions.get_id",
        "SELECT release_version_id FROM {{owner}}release_versions WHERE release_version = $1",
    ),
    (
        "release_versions.insert",
        "INSERT INTO {{owner}}release_versions (release_version_id, release_version) VALUES ($1, $2)",
    ),
    (
        "parameter_set_hashes.get_id",
        "SELECT parameter_set_hash_id FROM {{owner}}parameter_set_hashes WHERE pset_hash = $1",
    ),
    (
        "parameter_set_hashes.insert",
        "INSERT INTO {{owner}}parameter_set_hashes (parameter_set_hash_id, pset_hash, pset_name) \
         VALUES ($1, $2, $3)",
    ),
    (
        "output_module_configs.get_id",
        "SELECT output_mod_config_id FROM {{owner}}output_module_configs \
         WHERE app_exec_id = $1 AND release_version_id = $2 AND parameter_set_hash_id = $3 \
           AND output_module_label = $4 AND global_tag = $5",
    ),
    (
        "output_module_configs.insert",
        "INSERT INTO {{owner}}output_module_configs \
         (output_mod_config_id, app_exec_id, release_version_id, parameter_set_hash_id, \
          output_module_label, global_tag, scenario, creation_date, create_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    ),
    // ------------------------------------------------------------------
    // Blocks and files
    // ------------------------------------------------------------------
    (
        "blocks.get_id",
        "SELECT block_id FROM {{owner}}blocks WHERE block_name = $1",
    ),
    (
        "blocks.get",
        "SELECT block_id, dataset_id FROM {{owner}}blocks WHERE block_name = $1",
    ),
    (
        "blocks.insert",
        "INSERT INTO {{owner}}blocks \
         (block_id, block_name, dataset_id, open_for_writing, origin_site_name, block_size, \
          file_count, creation_date, create_by, last_modification_date, last_modified_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (block_name) DO NOTHING",
    ),
    (
        "files.get",
        "SELECT file_id, block_id FROM {{owner}}files WHERE logical_file_name = $1",
    ),
    (
        "files.get_id",
        "SELECT file_id FROM {{owner}}files WHERE logical_file_name = $1",
    ),
    (
        "files.insert",
        "INSERT INTO {{owner}}files \
         (file_id, logical_file_name, is_file_valid, dataset_id, block_id, file_type_id, \
          check_sum, event_count, file_size, adler32, md5, auto_cross_section, \
          creation_date, create_by, last_modification_date, last_modified_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    ),
    // ------------------------------------------------------------------
    // Lumi sections
    // ------------------------------------------------------------------
    (
        "file_lumis.exists",
        "SELECT file_id FROM {{owner}}file_lumis \
         WHERE file_id = $1 AND run_num = $2 AND lumi_section_num = $3",
    ),
    (
        "file_lumis.insert",
        "INSERT INTO {{owner}}file_lumis (run_num, lumi_section_num, file_id, event_count) \
         VALUES ($1, $2, $3, $4)",
    ),
    (
        "file_lumis.insert_many",
        "INSERT INTO {{owner}}file_lumis (run_num, lumi_section_num, file_id, event_count) ",
    ),
    (
        "file_lumis.on_conflict",
        " ON CONFLICT (file_id, run_num, lumi_section_num) DO NOTHING",
    ),
    (
        "file_lumis.stage.create",
        "CREATE TEMP TABLE IF NOT EXISTS tmp_file_lumis \
         (run_num BIGINT NOT NULL, lumi_section_num BIGINT NOT NULL, \
          file_id BIGINT NOT NULL, event_count BIGINT) ON COMMIT DROP",
    ),
    ("file_lumis.stage.clear", "DELETE FROM tmp_file_lumis"),
    (
        "file_lumis.stage.load",
        "INSERT INTO tmp_file_lumis (run_num, lumi_section_num, file_id, event_count) \
         SELECT t.run_num, t.lumi_section_num, $3, t.event_count \
         FROM UNNEST($1::BIGINT[], $2::BIGINT[], $4::BIGINT[]) AS t(run_num, lumi_section_num, event_count)",
    ),
    (
        "file_lumis.stage.merge",
        "INSERT INTO {{owner}}file_lumis (run_num, lumi_section_num, file_id, event_count) \
         SELECT run_num, lumi_section_num, file_id, event_count FROM tmp_file_lumis \
         ON CONFLICT (file_id, run_num, lumi_section_num) DO NOTHING",
    ),
    // ------------------------------------------------------------------
    // Parentage and configuration links
    // ------------------------------------------------------------------
    (
        "file_parents.insert",
        "INSERT INTO {{owner}}file_parents (this_file_id, parent_file_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    ),
    (
        "dataset_parents.insert",
        "INSERT INTO {{owner}}dataset_parents (this_dataset_id, parent_dataset_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    ),
    (
        "dataset_output_mod_configs.insert",
        "INSERT INTO {{owner}}dataset_output_mod_configs (dataset_id, output_mod_config_id) \
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    ),
    (
        "file_output_mod_configs.insert",
        "INSERT INTO {{owner}}file_output_mod_configs (file_id, output_mod_config_id) \
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    ),
    // ------------------------------------------------------------------
    // Read queries
    // ------------------------------------------------------------------
    (
        "blocks.list",
        "SELECT b.block_id, b.block_name, d.dataset, b.open_for_writing, b.origin_site_name, \
                b.block_size, b.file_count, b.creation_date, b.create_by \
         FROM {{owner}}blocks b JOIN {{owner}}datasets d ON d.dataset_id = b.dataset_id \
         WHERE ($1::TEXT IS NULL OR b.block_name = $1) \
           AND ($2::TEXT IS NULL OR d.dataset = $2) \
         ORDER BY b.block_name",
    ),
    (
        "files.list",
        "SELECT f.file_id, f.logical_file_name, f.is_file_valid, b.block_name, d.dataset, \
                t.file_type, f.check_sum, f.event_count, f.file_size, f.adler32, f.md5, \
                f.auto_cross_section, f.creation_date, f.create_by \
         FROM {{owner}}files f \
         JOIN {{owner}}blocks b ON b.block_id = f.block_id \
         JOIN {{owner}}datasets d ON d.dataset_id = f.dataset_id \
         JOIN {{owner}}file_data_types t ON t.file_type_id = f.file_type_id \
         WHERE ($1::TEXT IS NULL OR f.logical_file_name = $1) \
           AND ($2::TEXT IS NULL OR b.block_name = $2) \
           AND ($3::TEXT IS NULL OR d.dataset = $3) \
         ORDER BY f.logical_file_name",
    ),
    (
        "file_parents.list",
        "SELECT c.logical_file_name, p.logical_file_name AS parent_logical_file_name, \
                p.file_id AS parent_file_id \
         FROM {{owner}}file_parents fp \
         JOIN {{owner}}files c ON c.file_id = fp.this_file_id \
         JOIN {{owner}}files p ON p.file_id = fp.parent_file_id \
         WHERE c.logical_file_name = $1 \
         ORDER BY p.logical_file_name",
    ),
    (
        "file_children.list",
        "SELECT p.logical_file_name, c.logical_file_name AS child_logical_file_name, \
                c.file_id AS child_file_id \
         FROM {{owner}}file_parents fp \
         JOIN {{owner}}files c ON c.file_id = fp.this_file_id \
         JOIN {{owner}}files p ON p.file_id = fp.parent_file_id \
         WHERE p.logical_file_name = $1 \
         ORDER BY c.logical_file_name",
    ),
    (
        "file_lumis.list",
        "SELECT f.logical_file_name, l.run_num, l.lumi_section_num, l.event_count \
         FROM {{owner}}file_lumis l JOIN {{owner}}files f ON f.file_id = l.file_id \
         WHERE f.logical_file_name = $1 \
         ORDER BY l.run_num, l.lumi_section_num",
    ),
];
